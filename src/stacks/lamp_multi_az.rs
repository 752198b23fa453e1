//! Load balanced, auto-scaled web tier in front of a MySQL RDS instance.

use serde_json::{json, Value};

use super::mappings::{
    self, ARCH_KEY, INSTANCE_TYPE_TO_ARCH, INSTANCE_TYPE_TO_NAT_ARCH, REGION_ARCH_TO_AMI,
};
use crate::template::builder::{self, TemplateBuilder};
use crate::template::intrinsic::{
    base64, find_in_map, get_att, join, reference, select, AWS_REGION, AWS_STACK_ID,
    AWS_STACK_NAME,
};
use crate::template::{Output, Parameter, ParameterType, Resource, Template};

pub const DESCRIPTION: &str = "Highly available LAMP stack: an Application Load Balancer in \
front of an auto-scaled group of Apache/PHP web servers, backed by a MySQL RDS instance \
with an optional Multi-AZ standby.";

const DB_INSTANCE_CLASSES: [&str; 26] = [
    "db.m1.small",
    "db.m1.medium",
    "db.m1.large",
    "db.m1.xlarge",
    "db.m2.xlarge",
    "db.m2.2xlarge",
    "db.m2.4xlarge",
    "db.m3.medium",
    "db.m3.large",
    "db.m3.xlarge",
    "db.m3.2xlarge",
    "db.m4.large",
    "db.m4.xlarge",
    "db.m4.2xlarge",
    "db.m4.4xlarge",
    "db.m4.10xlarge",
    "db.r3.large",
    "db.r3.xlarge",
    "db.r3.2xlarge",
    "db.r3.4xlarge",
    "db.r3.8xlarge",
    "db.t2.micro",
    "db.t2.small",
    "db.t2.medium",
    "db.t2.large",
    "db.t2.xlarge",
];

const ALPHANUMERIC_NAME: &str = "[a-zA-Z][a-zA-Z0-9]*";

pub fn template() -> Result<Template, builder::Error> {
    TemplateBuilder::new(DESCRIPTION)
        .parameter(
            "VpcId",
            Parameter::new(ParameterType::VpcId)
                .description("VpcId of your existing Virtual Private Cloud (VPC)")
                .constraint_description(
                    "must be the VPC Id of an existing Virtual Private Cloud.",
                ),
        )
        .parameter(
            "Subnets",
            Parameter::new(ParameterType::SubnetIdList)
                .description("The list of SubnetIds in your Virtual Private Cloud (VPC)")
                .constraint_description(
                    "must be a list of at least two existing subnets associated with at least \
                     two different availability zones. They should be residing in the selected \
                     Virtual Private Cloud.",
                ),
        )
        .parameter(
            "KeyName",
            Parameter::new(ParameterType::KeyPairName)
                .description(
                    "Name of an existing EC2 KeyPair to enable SSH access to the instances",
                )
                .constraint_description("must be the name of an existing EC2 KeyPair."),
        )
        .parameter(
            "DBName",
            Parameter::new(ParameterType::String)
                .default_value("myDatabase")
                .description("MySQL database name")
                .length(1, 64)
                .allowed_pattern(ALPHANUMERIC_NAME)
                .constraint_description(
                    "must begin with a letter and contain only alphanumeric characters.",
                ),
        )
        .parameter(
            "DBUser",
            Parameter::new(ParameterType::String)
                .no_echo()
                .description("Username for MySQL database access")
                .length(1, 16)
                .allowed_pattern(ALPHANUMERIC_NAME)
                .constraint_description(
                    "must begin with a letter and contain only alphanumeric characters.",
                ),
        )
        .parameter(
            "DBPassword",
            Parameter::new(ParameterType::String)
                .no_echo()
                .description("Password for MySQL database access")
                .length(8, 41)
                .allowed_pattern("[a-zA-Z0-9]*")
                .constraint_description("must contain only alphanumeric characters."),
        )
        .parameter(
            "DBAllocatedStorage",
            Parameter::new(ParameterType::Number)
                .default_value("5")
                .description("The size of the database (Gb)")
                .value_range(5, 1024)
                .constraint_description("must be between 5 and 1024Gb."),
        )
        .parameter(
            "DBInstanceClass",
            Parameter::new(ParameterType::String)
                .default_value("db.t2.small")
                .description("The database instance type")
                .allowed_values(DB_INSTANCE_CLASSES)
                .constraint_description("must select a valid database instance type."),
        )
        .parameter(
            "MultiAZDatabase",
            Parameter::new(ParameterType::String)
                .default_value("false")
                .description("Create a Multi-AZ MySQL Amazon RDS database instance")
                .allowed_values(["true", "false"])
                .constraint_description("must be either true or false."),
        )
        .parameter(
            "WebServerCapacity",
            Parameter::new(ParameterType::Number)
                .default_value("2")
                .description("The initial number of WebServer instances")
                .value_range(1, 5)
                .constraint_description("must be between 1 and 5 EC2 instances."),
        )
        .parameter(
            "InstanceType",
            Parameter::new(ParameterType::String)
                .default_value("t2.small")
                .description("WebServer EC2 instance type")
                .allowed_values(mappings::instance_type_names())
                .constraint_description("must be a valid EC2 instance type."),
        )
        .parameter(
            "SSHLocation",
            Parameter::new(ParameterType::String)
                .default_value("0.0.0.0/0")
                .description("The IP address range that can be used to SSH to the EC2 instances")
                .length(9, 18)
                .allowed_pattern(r"(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})/(\d{1,2})")
                .constraint_description("must be a valid IP CIDR range of the form x.x.x.x/x."),
        )
        .mapping(INSTANCE_TYPE_TO_ARCH, mappings::instance_type_to_arch())
        .mapping(INSTANCE_TYPE_TO_NAT_ARCH, mappings::instance_type_to_nat_arch())
        .mapping(REGION_ARCH_TO_AMI, mappings::region_arch_to_ami())
        .resource(
            "ApplicationLoadBalancer",
            Resource::new("AWS::ElasticLoadBalancingV2::LoadBalancer")
                .property("Subnets", reference("Subnets")),
        )
        .resource(
            "ALBListener",
            Resource::new("AWS::ElasticLoadBalancingV2::Listener")
                .property(
                    "DefaultActions",
                    json!([{ "Type": "forward", "TargetGroupArn": reference("ALBTargetGroup") }]),
                )
                .property("LoadBalancerArn", reference("ApplicationLoadBalancer"))
                .property("Port", "80")
                .property("Protocol", "HTTP"),
        )
        .resource("ALBTargetGroup", target_group())
        .resource("WebServerGroup", web_server_group())
        .resource("LaunchConfig", launch_config())
        .resource(
            "WebServerSecurityGroup",
            Resource::new("AWS::EC2::SecurityGroup")
                .property(
                    "GroupDescription",
                    "Enable HTTP access via port 80 locked down to the ELB and SSH access",
                )
                .property(
                    "SecurityGroupIngress",
                    json!([
                        {
                            "IpProtocol": "tcp",
                            "FromPort": 80,
                            "ToPort": 80,
                            "SourceSecurityGroupId":
                                select(0, get_att("ApplicationLoadBalancer", "SecurityGroups"))
                        },
                        {
                            "IpProtocol": "tcp",
                            "FromPort": 22,
                            "ToPort": 22,
                            "CidrIp": reference("SSHLocation")
                        }
                    ]),
                )
                .property("VpcId", reference("VpcId")),
        )
        .resource(
            "DBEC2SecurityGroup",
            Resource::new("AWS::EC2::SecurityGroup")
                .property("GroupDescription", "Open database for access")
                .property(
                    "SecurityGroupIngress",
                    json!([{
                        "IpProtocol": "tcp",
                        "FromPort": 3306,
                        "ToPort": 3306,
                        "SourceSecurityGroupId": reference("WebServerSecurityGroup")
                    }]),
                )
                .property("VpcId", reference("VpcId")),
        )
        .resource(
            "MySQLDatabase",
            Resource::new("AWS::RDS::DBInstance")
                .property("Engine", "MySQL")
                .property("DBName", reference("DBName"))
                .property("MultiAZ", reference("MultiAZDatabase"))
                .property("MasterUsername", reference("DBUser"))
                .property("MasterUserPassword", reference("DBPassword"))
                .property("DBInstanceClass", reference("DBInstanceClass"))
                .property("AllocatedStorage", reference("DBAllocatedStorage"))
                .property(
                    "VPCSecurityGroups",
                    vec![get_att("DBEC2SecurityGroup", "GroupId")],
                ),
        )
        .output(
            "WebsiteURL",
            Output::new(join(
                "",
                [
                    json!("http://"),
                    get_att("ApplicationLoadBalancer", "DNSName"),
                    json!("/"),
                ],
            ))
            .description("URL for newly created LAMP stack"),
        )
        .build()
}

fn target_group() -> Resource {
    Resource::new("AWS::ElasticLoadBalancingV2::TargetGroup")
        .property("HealthCheckPath", "/")
        .property("HealthCheckIntervalSeconds", 10)
        .property("HealthCheckTimeoutSeconds", 5)
        .property("HealthyThresholdCount", 2)
        .property("Port", 80)
        .property("Protocol", "HTTP")
        .property("UnhealthyThresholdCount", 5)
        .property("VpcId", reference("VpcId"))
        .property(
            "TargetGroupAttributes",
            json!([
                { "Key": "stickiness.enabled", "Value": "true" },
                { "Key": "stickiness.type", "Value": "lb_cookie" },
                { "Key": "stickiness.lb_cookie.duration_seconds", "Value": "30" }
            ]),
        )
}

fn web_server_group() -> Resource {
    Resource::new("AWS::AutoScaling::AutoScalingGroup")
        .property("VPCZoneIdentifier", reference("Subnets"))
        .property("LaunchConfigurationName", reference("LaunchConfig"))
        .property("MinSize", "1")
        .property("MaxSize", "5")
        .property("DesiredCapacity", reference("WebServerCapacity"))
        .property("TargetGroupARNs", vec![reference("ALBTargetGroup")])
        .creation_policy(json!({
            "ResourceSignal": {
                "Timeout": "PT15M",
                "Count": reference("WebServerCapacity")
            }
        }))
        .update_policy(json!({
            "AutoScalingRollingUpdate": {
                "MinInstancesInService": "1",
                "MaxBatchSize": "1",
                "PauseTime": "PT15M",
                "WaitOnResourceSignals": "true"
            }
        }))
}

fn launch_config() -> Resource {
    let image_id = find_in_map(
        REGION_ARCH_TO_AMI,
        reference(AWS_REGION),
        find_in_map(INSTANCE_TYPE_TO_ARCH, reference("InstanceType"), ARCH_KEY),
    );

    Resource::new("AWS::AutoScaling::LaunchConfiguration")
        .metadata(
            "Comment1",
            "Configure the bootstrap helpers to install the Apache Web Server and PHP",
        )
        .metadata("AWS::CloudFormation::Init", cfn_init())
        .property("ImageId", image_id)
        .property("InstanceType", reference("InstanceType"))
        .property("SecurityGroups", vec![reference("WebServerSecurityGroup")])
        .property("KeyName", reference("KeyName"))
        .property("UserData", user_data())
}

fn cfn_init() -> Value {
    json!({
        "configSets": {
            "InstallAndRun": ["Install"]
        },
        "Install": {
            "packages": {
                "yum": {
                    "httpd": [],
                    "php": [],
                    "php-mysql": []
                }
            },
            "files": {
                "/var/www/html/index.php": {
                    "content": index_page(),
                    "mode": "000600",
                    "owner": "apache",
                    "group": "apache"
                },
                "/etc/cfn/cfn-hup.conf": {
                    "content": join("", [
                        json!("[main]\n"),
                        json!("stack="), reference(AWS_STACK_ID), json!("\n"),
                        json!("region="), reference(AWS_REGION), json!("\n")
                    ]),
                    "mode": "000400",
                    "owner": "root",
                    "group": "root"
                },
                "/etc/cfn/hooks.d/cfn-auto-reloader.conf": {
                    "content": join("", [
                        json!("[cfn-auto-reloader-hook]\n"),
                        json!("triggers=post.update\n"),
                        json!("path=Resources.LaunchConfig.Metadata.AWS::CloudFormation::Init\n"),
                        json!("action=/opt/aws/bin/cfn-init -v "),
                        json!("         --stack "), reference(AWS_STACK_NAME),
                        json!("         --resource LaunchConfig "),
                        json!("         --configsets InstallAndRun "),
                        json!("         --region "), reference(AWS_REGION), json!("\n"),
                        json!("runas=root\n")
                    ]),
                    "mode": "000400",
                    "owner": "root",
                    "group": "root"
                }
            },
            "services": {
                "sysvinit": {
                    "httpd": { "enabled": "true", "ensureRunning": "true" },
                    "cfn-hup": {
                        "enabled": "true",
                        "ensureRunning": "true",
                        "files": [
                            "/etc/cfn/cfn-hup.conf",
                            "/etc/cfn/hooks.d/cfn-auto-reloader.conf"
                        ]
                    }
                }
            }
        }
    })
}

fn index_page() -> Value {
    join(
        "",
        [
            json!("<html>\n"),
            json!("  <head>\n"),
            json!("    <title>AWS CloudFormation PHP Sample</title>\n"),
            json!(concat!(
                "    <meta http-equiv=\"Content-Type\" ",
                "content=\"text/html; charset=ISO-8859-1\">\n",
            )),
            json!("  </head>\n"),
            json!("  <body>\n"),
            json!("    <h1>Welcome to the AWS CloudFormation PHP Sample</h1>\n"),
            json!("    <p/>\n"),
            json!("    <?php\n"),
            json!("      // Print out the current data and time\n"),
            json!("      print \"The Current Date and Time is: <br/>\";\n"),
            json!("      print date(\"g:i A l, F j Y.\");\n"),
            json!("    ?>\n"),
            json!("    <p/>\n"),
            json!("    <?php\n"),
            json!("      // Setup a handle for CURL\n"),
            json!("      $curl_handle=curl_init();\n"),
            json!("      curl_setopt($curl_handle,CURLOPT_CONNECTTIMEOUT,2);\n"),
            json!("      curl_setopt($curl_handle,CURLOPT_RETURNTRANSFER,1);\n"),
            json!("      // Get the hostname of the intance from the instance metadata\n"),
            json!(concat!(
                "      curl_setopt($curl_handle,CURLOPT_URL,",
                "'http://169.254.169.254/latest/meta-data/public-hostname');\n",
            )),
            json!("      $hostname = curl_exec($curl_handle);\n"),
            json!("      if (empty($hostname))\n"),
            json!("      {\n"),
            json!("        print \"Sorry, for some reason, we got no hostname back <br />\";\n"),
            json!("      }\n"),
            json!("      else\n"),
            json!("      {\n"),
            json!("        print \"Server = \" . $hostname . \"<br />\";\n"),
            json!("      }\n"),
            json!("      // Get the instance-id of the intance from the instance metadata\n"),
            json!(concat!(
                "      curl_setopt($curl_handle,CURLOPT_URL,",
                "'http://169.254.169.254/latest/meta-data/instance-id');\n",
            )),
            json!("      $instanceid = curl_exec($curl_handle);\n"),
            json!("      if (empty($instanceid))\n"),
            json!("      {\n"),
            json!("        print \"Sorry, for some reason, we got no instance id back <br />\";\n"),
            json!("      }\n"),
            json!("      else\n"),
            json!("      {\n"),
            json!("        print \"EC2 instance-id = \" . $instanceid . \"<br />\";\n"),
            json!("      }\n"),
            json!("      $Database   = \""),
            get_att("MySQLDatabase", "Endpoint.Address"),
            json!("\";\n"),
            json!("      $DBUser     = \""),
            reference("DBUser"),
            json!("\";\n"),
            json!("      $DBPassword = \""),
            reference("DBPassword"),
            json!("\";\n"),
            json!("      print \"Database = \" . $Database . \"<br />\";\n"),
            json!("      $dbconnection = mysql_connect($Database, $DBUser, $DBPassword)\n"),
            json!("                      or die(\"Could not connect: \" . mysql_error());\n"),
            json!("      print (\"Connected to $Database successfully\");\n"),
            json!("      mysql_close($dbconnection);\n"),
            json!("    ?>\n"),
            json!("    <h2>PHP Information</h2>\n"),
            json!("    <p/>\n"),
            json!("    <?php\n"),
            json!("      phpinfo();\n"),
            json!("    ?>\n"),
            json!("  </body>\n"),
            json!("</html>\n"),
        ],
    )
}

fn user_data() -> Value {
    base64(join(
        "",
        [
            json!("#!/bin/bash -xe\n"),
            json!("yum update -y aws-cfn-bootstrap\n"),
            json!("/opt/aws/bin/cfn-init -v "),
            json!("         --stack "),
            reference(AWS_STACK_NAME),
            json!("         --resource LaunchConfig "),
            json!("         --configsets InstallAndRun "),
            json!("         --region "),
            reference(AWS_REGION),
            json!("\n"),
            json!("/opt/aws/bin/cfn-signal -e $? "),
            json!("         --stack "),
            reference(AWS_STACK_NAME),
            json!("         --resource WebServerGroup "),
            json!("         --region "),
            reference(AWS_REGION),
            json!("\n"),
        ],
    ))
}
