//! Network component: VPC, internet gateway, and one public plus one private
//! subnet per availability zone.
//!
//! Each AZ gets a NAT gateway in its public subnet. Private subnets route
//! outbound traffic through it and accept no inbound traffic from outside
//! the VPC.

use std::net::Ipv4Addr;

use serde_json::json;
use threetier_common::{Expr, ResourceDecl, resource_types as rt};

use crate::domain::config::{NetworkConfig, parse_cidr};
use crate::domain::error::DeclarationError;
use crate::domain::topology::{Topology, logical_id};

/// Smallest subnet the declaration layer will carve.
const MAX_SUBNET_PREFIX: u8 = 28;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSpec {
    pub name: String,
    pub max_azs: u8,
    pub cidr: String,
}

/// References to the declared network, used as dependency anchors by the
/// database and compute tiers.
#[derive(Debug, Clone)]
pub struct NetworkHandle {
    pub logical_id: String,
    pub vpc: Expr,
    pub cidr: String,
    pub public_subnets: Vec<Expr>,
    pub private_subnets: Vec<Expr>,
}

impl From<&NetworkConfig> for NetworkSpec {
    fn from(cfg: &NetworkConfig) -> Self {
        Self {
            name: cfg.name.clone(),
            max_azs: cfg.max_azs,
            cidr: cfg.cidr.clone(),
        }
    }
}

impl NetworkSpec {
    /// Declare the VPC and its subnets.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_azs` is zero, the CIDR is malformed or too
    /// small for `2 * max_azs` subnets, or a logical id collides.
    pub fn declare(&self, topo: &mut Topology) -> Result<NetworkHandle, DeclarationError> {
        if self.max_azs == 0 {
            return Err(DeclarationError::NoAvailabilityZones(self.name.clone()));
        }
        let azs = u32::from(self.max_azs);
        let blocks = carve_subnets(&self.cidr, azs * 2)?;
        let (public_blocks, private_blocks) = blocks.split_at(azs as usize);

        let vpc_id = logical_id(&[&self.name]);
        let vpc = topo.declare(
            &vpc_id,
            ResourceDecl::new(rt::VPC)
                .with_property("CidrBlock", self.cidr.as_str())
                .with_property("EnableDnsHostnames", true)
                .with_property("EnableDnsSupport", true)
                .with_property("InstanceTenancy", "default")
                .with_property("Tags", name_tag(&self.name)),
        )?;

        let igw_id = format!("{vpc_id}IGW");
        let igw = topo.declare(
            &igw_id,
            ResourceDecl::new(rt::INTERNET_GATEWAY).with_property("Tags", name_tag(&self.name)),
        )?;
        let attachment_id = format!("{vpc_id}VPCGW");
        topo.declare(
            &attachment_id,
            ResourceDecl::new(rt::GATEWAY_ATTACHMENT)
                .with_property("VpcId", vpc.clone())
                .with_property("InternetGatewayId", igw.clone()),
        )?;

        let mut public_subnets = Vec::with_capacity(public_blocks.len());
        let mut nat_gateways = Vec::with_capacity(public_blocks.len());
        for (i, block) in public_blocks.iter().enumerate() {
            let n = i + 1;
            let name = format!("{}/PublicSubnet{n}", self.name);
            let subnet_id = format!("{vpc_id}PublicSubnet{n}");
            let subnet = topo.declare(
                &subnet_id,
                subnet_decl(&vpc, block, i, true, &name),
            )?;

            let table_id = format!("{subnet_id}RouteTable");
            let table = topo.declare(
                &table_id,
                ResourceDecl::new(rt::ROUTE_TABLE)
                    .with_property("VpcId", vpc.clone())
                    .with_property("Tags", name_tag(&name)),
            )?;
            let association_id = format!("{subnet_id}RouteTableAssociation");
            topo.declare(
                &association_id,
                ResourceDecl::new(rt::SUBNET_ROUTE_TABLE_ASSOCIATION)
                    .with_property("RouteTableId", table.clone())
                    .with_property("SubnetId", subnet.clone()),
            )?;
            let route_id = format!("{subnet_id}DefaultRoute");
            let mut route = ResourceDecl::new(rt::ROUTE)
                .with_property("RouteTableId", table)
                .with_property("DestinationCidrBlock", "0.0.0.0/0")
                .with_property("GatewayId", igw.clone());
            // The route is rejected until the gateway is attached to the VPC.
            route.depends_on.push(attachment_id.clone());
            topo.declare(&route_id, route)?;

            let eip_id = format!("{subnet_id}EIP");
            topo.declare(
                &eip_id,
                ResourceDecl::new(rt::EIP)
                    .with_property("Domain", "vpc")
                    .with_property("Tags", name_tag(&name)),
            )?;
            let mut nat = ResourceDecl::new(rt::NAT_GATEWAY)
                .with_property("SubnetId", subnet.clone())
                .with_property("AllocationId", Expr::get_att(&eip_id, "AllocationId"))
                .with_property("Tags", name_tag(&name));
            // The gateway needs a working public route before it can serve egress.
            nat.depends_on.push(association_id);
            nat.depends_on.push(route_id);
            nat_gateways.push(topo.declare(&format!("{subnet_id}NATGateway"), nat)?);

            public_subnets.push(subnet);
        }

        let mut private_subnets = Vec::with_capacity(private_blocks.len());
        for (i, block) in private_blocks.iter().enumerate() {
            let n = i + 1;
            let name = format!("{}/PrivateSubnet{n}", self.name);
            let subnet_id = format!("{vpc_id}PrivateSubnet{n}");
            let subnet = topo.declare(&subnet_id, subnet_decl(&vpc, block, i, false, &name))?;

            let table = topo.declare(
                &format!("{subnet_id}RouteTable"),
                ResourceDecl::new(rt::ROUTE_TABLE)
                    .with_property("VpcId", vpc.clone())
                    .with_property("Tags", name_tag(&name)),
            )?;
            topo.declare(
                &format!("{subnet_id}RouteTableAssociation"),
                ResourceDecl::new(rt::SUBNET_ROUTE_TABLE_ASSOCIATION)
                    .with_property("RouteTableId", table.clone())
                    .with_property("SubnetId", subnet.clone()),
            )?;
            let mut route = ResourceDecl::new(rt::ROUTE)
                .with_property("RouteTableId", table)
                .with_property("DestinationCidrBlock", "0.0.0.0/0")
                .with_property("NatGatewayId", nat_gateways[i].clone());
            route.depends_on.push(attachment_id.clone());
            topo.declare(&format!("{subnet_id}DefaultRoute"), route)?;

            private_subnets.push(subnet);
        }

        Ok(NetworkHandle {
            logical_id: vpc_id,
            vpc,
            cidr: self.cidr.clone(),
            public_subnets,
            private_subnets,
        })
    }
}

fn subnet_decl(vpc: &Expr, block: &str, az: usize, public: bool, name: &str) -> ResourceDecl {
    #[allow(clippy::cast_possible_truncation)]
    let az = Expr::availability_zone(az as u32);
    ResourceDecl::new(rt::SUBNET)
        .with_property("VpcId", vpc.clone())
        .with_property("CidrBlock", block)
        .with_property("AvailabilityZone", az)
        .with_property("MapPublicIpOnLaunch", public)
        .with_property(
            "Tags",
            json!([
                { "Key": "Name", "Value": name },
                { "Key": "threetier:subnet-type", "Value": if public { "Public" } else { "Private" } }
            ]),
        )
}

fn name_tag(name: &str) -> serde_json::Value {
    json!([{ "Key": "Name", "Value": name }])
}

/// Split `cidr` into `count` equal, consecutive, non-overlapping blocks.
///
/// The block size is the largest power of two that fits `count` blocks, so
/// `10.0.0.0/16` split four ways yields four `/18`s.
///
/// # Errors
///
/// Returns `InvalidCidr` for malformed input and `CidrExhausted` when the
/// blocks would be smaller than a `/28`.
pub fn carve_subnets(cidr: &str, count: u32) -> Result<Vec<String>, DeclarationError> {
    let (addr, prefix) =
        parse_cidr(cidr).ok_or_else(|| DeclarationError::InvalidCidr(cidr.to_string()))?;
    if count == 0 {
        return Ok(Vec::new());
    }

    let extra_bits = u8::try_from(count.next_power_of_two().trailing_zeros())
        .map_err(|_| DeclarationError::InvalidCidr(cidr.to_string()))?;
    let new_prefix = prefix + extra_bits;
    if new_prefix > MAX_SUBNET_PREFIX {
        return Err(DeclarationError::CidrExhausted {
            cidr: cidr.to_string(),
            needed: count,
        });
    }

    let mask = if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    };
    let base = u32::from(addr) & mask;
    let step = 1u32 << (32 - u32::from(new_prefix));

    Ok((0..count)
        .map(|i| format!("{}/{new_prefix}", Ipv4Addr::from(base + i * step)))
        .collect())
}
