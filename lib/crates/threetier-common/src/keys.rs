/// CloudFormation resource type names emitted by the declaration layer.
pub mod resource_types {
    pub const RESOURCE_GROUP: &str = "AWS::ResourceGroups::Group";

    pub const VPC: &str = "AWS::EC2::VPC";
    pub const SUBNET: &str = "AWS::EC2::Subnet";
    pub const INTERNET_GATEWAY: &str = "AWS::EC2::InternetGateway";
    pub const GATEWAY_ATTACHMENT: &str = "AWS::EC2::VPCGatewayAttachment";
    pub const ROUTE_TABLE: &str = "AWS::EC2::RouteTable";
    pub const ROUTE: &str = "AWS::EC2::Route";
    pub const SUBNET_ROUTE_TABLE_ASSOCIATION: &str = "AWS::EC2::SubnetRouteTableAssociation";
    pub const EIP: &str = "AWS::EC2::EIP";
    pub const NAT_GATEWAY: &str = "AWS::EC2::NatGateway";
    pub const SECURITY_GROUP: &str = "AWS::EC2::SecurityGroup";

    pub const SECRET: &str = "AWS::SecretsManager::Secret";
    /// Binds a secret to the database it authenticates (enables rotation).
    pub const SECRET_ATTACHMENT: &str = "AWS::SecretsManager::SecretTargetAttachment";

    pub const DB_SUBNET_GROUP: &str = "AWS::RDS::DBSubnetGroup";
    pub const DB_INSTANCE: &str = "AWS::RDS::DBInstance";

    pub const ROLE: &str = "AWS::IAM::Role";
    pub const POLICY: &str = "AWS::IAM::Policy";
    pub const INSTANCE_PROFILE: &str = "AWS::IAM::InstanceProfile";

    pub const EB_APPLICATION: &str = "AWS::ElasticBeanstalk::Application";
    pub const EB_ENVIRONMENT: &str = "AWS::ElasticBeanstalk::Environment";
}

/// Elastic Beanstalk option-setting namespaces.
pub mod namespaces {
    /// Launch configuration of the environment's instances.
    pub const LAUNCH_CONFIGURATION: &str = "aws:autoscaling:launchconfiguration";
    /// Environment variables exported to the application process.
    pub const APPLICATION_ENVIRONMENT: &str = "aws:elasticbeanstalk:application:environment";

    pub const IAM_INSTANCE_PROFILE: &str = "IamInstanceProfile";
}

/// Environment variable names the application code reads at startup.
///
/// These names are part of the contract with the deployed application and
/// must not change.
pub mod env_vars {
    pub const DB_HOST: &str = "DB_HOST";
    pub const DB_PORT: &str = "DB_PORT";
    pub const DB_CREDS_SECRET: &str = "DB_CREDS_SECRET";

    pub const REQUIRED: &[&str] = &[DB_HOST, DB_PORT, DB_CREDS_SECRET];
}
