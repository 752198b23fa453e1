//! Single web server with a MariaDB RDS instance, locked down to a trusted CIDR.

use serde_json::json;

use crate::template::builder::{self, TemplateBuilder};
use crate::template::intrinsic::{get_att, reference, select};
use crate::template::{Output, Parameter, ParameterType, Resource, Template};

pub const DESCRIPTION: &str = "Modernized LAMP Stack Deployment with AWS Best Practices";

const WEB_SERVER_AMI: &str = "ami-08c40ec9ead489470";

pub fn template() -> Result<Template, builder::Error> {
    TemplateBuilder::new(DESCRIPTION)
        .parameter(
            "VpcId",
            Parameter::new(ParameterType::VpcId)
                .description("VpcId of your existing Virtual Private Cloud (VPC)")
                .constraint_description("Must be an existing VPC ID."),
        )
        .parameter(
            "SubnetIds",
            Parameter::new(ParameterType::SubnetIdList)
                .description("List of SubnetIds for your VPC.")
                .constraint_description("Must be a list of existing Subnet IDs."),
        )
        .parameter(
            "KeyPairName",
            Parameter::new(ParameterType::KeyPairName)
                .description("Name of an existing EC2 KeyPair for SSH access."),
        )
        .parameter(
            "DBUsername",
            Parameter::new(ParameterType::String)
                .no_echo()
                .description("Database admin username."),
        )
        .parameter(
            "DBPassword",
            Parameter::new(ParameterType::String)
                .no_echo()
                .description("Database admin password."),
        )
        .parameter(
            "InstanceType",
            Parameter::new(ParameterType::String)
                .default_value("t4g.micro")
                .allowed_values(["t4g.micro", "t4g.small", "t4g.medium", "t4g.large"])
                .description(
                    "Instance type for EC2 instances optimized for cost and performance.",
                ),
        )
        .parameter(
            "TrustedCIDR",
            Parameter::new(ParameterType::String)
                .default_value("192.168.0.0/16")
                .description("CIDR block for trusted network access to EC2 instances."),
        )
        .resource("WebServerInstance", web_server_instance())
        .resource("WebServerSG", web_server_security_group())
        .resource("DatabaseInstance", database_instance())
        .resource(
            "DBSubnetGroup",
            Resource::new("AWS::RDS::DBSubnetGroup")
                .property("DBSubnetGroupDescription", "Subnets for the RDS DB Instance.")
                .property("SubnetIds", reference("SubnetIds")),
        )
        .output(
            "WebServerPublicIP",
            Output::new(get_att("WebServerInstance", "PublicIp"))
                .description("Public IP of the Web Server instance."),
        )
        .output(
            "RDSInstanceEndpoint",
            Output::new(get_att("DatabaseInstance", "Endpoint.Address"))
                .description("RDS Instance Endpoint."),
        )
        .build()
}

fn web_server_instance() -> Resource {
    Resource::new("AWS::EC2::Instance")
        .property("InstanceType", reference("InstanceType"))
        .property("KeyName", reference("KeyPairName"))
        .property("ImageId", WEB_SERVER_AMI)
        .property("SubnetId", select(0, reference("SubnetIds")))
        .property(
            "SecurityGroupIds",
            vec![get_att("WebServerSG", "GroupId")],
        )
        .metadata(
            "AWS::CloudFormation::Init",
            json!({
                "configSets": {
                    "default": ["install"]
                },
                "install": {
                    "packages": {
                        "yum": {
                            "httpd": [],
                            "php": [],
                            "mariadb-server": []
                        }
                    },
                    "services": {
                        "sysvinit": {
                            "httpd": {
                                "enabled": true,
                                "ensureRunning": true
                            },
                            "mariadb": {
                                "enabled": true,
                                "ensureRunning": true
                            }
                        }
                    }
                }
            }),
        )
        .creation_policy(json!({
            "ResourceSignal": { "Count": 1, "Timeout": "PT15M" }
        }))
}

fn web_server_security_group() -> Resource {
    Resource::new("AWS::EC2::SecurityGroup")
        .property(
            "GroupDescription",
            "Enable HTTP and SSH access for trusted networks only.",
        )
        .property("VpcId", reference("VpcId"))
        .property(
            "SecurityGroupIngress",
            json!([
                {
                    "CidrIp": reference("TrustedCIDR"),
                    "IpProtocol": "tcp",
                    "FromPort": 22,
                    "ToPort": 22
                },
                {
                    "CidrIp": reference("TrustedCIDR"),
                    "IpProtocol": "tcp",
                    "FromPort": 80,
                    "ToPort": 80
                }
            ]),
        )
}

fn database_instance() -> Resource {
    Resource::new("AWS::RDS::DBInstance")
        .property("DBInstanceClass", "db.t4g.micro")
        .property("Engine", "mariadb")
        .property("MasterUsername", reference("DBUsername"))
        .property("MasterUserPassword", reference("DBPassword"))
        .property("AllocatedStorage", "20")
        .property("DBSubnetGroupName", reference("DBSubnetGroup"))
        .property("MultiAZ", true)
        .property("PubliclyAccessible", false)
        .property("StorageEncrypted", true)
        .property("BackupRetentionPeriod", 7)
}
