//! Literal lookup tables shared by the auto-scaled stack.

use crate::template::Mapping;

pub const INSTANCE_TYPE_TO_ARCH: &str = "AWSInstanceType2Arch";
pub const INSTANCE_TYPE_TO_NAT_ARCH: &str = "AWSInstanceType2NATArch";
pub const REGION_ARCH_TO_AMI: &str = "AWSRegionArch2AMI";

pub const ARCH_KEY: &str = "Arch";

const HVM64: &str = "HVM64";
const HVMG2: &str = "HVMG2";
const NAT_HVM64: &str = "NATHVM64";
/// Region row value for an architecture the region has no AMI for.
pub const NOT_SUPPORTED: &str = "NOT_SUPPORTED";

/// Instance type and the AMI architecture it boots.
pub const INSTANCE_TYPES: [(&str, &str); 47] = [
    ("t1.micro", HVM64),
    ("t2.nano", HVM64),
    ("t2.micro", HVM64),
    ("t2.small", HVM64),
    ("t2.medium", HVM64),
    ("t2.large", HVM64),
    ("m1.small", HVM64),
    ("m1.medium", HVM64),
    ("m1.large", HVM64),
    ("m1.xlarge", HVM64),
    ("m2.xlarge", HVM64),
    ("m2.2xlarge", HVM64),
    ("m2.4xlarge", HVM64),
    ("m3.medium", HVM64),
    ("m3.large", HVM64),
    ("m3.xlarge", HVM64),
    ("m3.2xlarge", HVM64),
    ("m4.large", HVM64),
    ("m4.xlarge", HVM64),
    ("m4.2xlarge", HVM64),
    ("m4.4xlarge", HVM64),
    ("m4.10xlarge", HVM64),
    ("c1.medium", HVM64),
    ("c1.xlarge", HVM64),
    ("c3.large", HVM64),
    ("c3.xlarge", HVM64),
    ("c3.2xlarge", HVM64),
    ("c3.4xlarge", HVM64),
    ("c3.8xlarge", HVM64),
    ("c4.large", HVM64),
    ("c4.xlarge", HVM64),
    ("c4.2xlarge", HVM64),
    ("c4.4xlarge", HVM64),
    ("c4.8xlarge", HVM64),
    ("g2.2xlarge", HVMG2),
    ("g2.8xlarge", HVMG2),
    ("r3.large", HVM64),
    ("r3.xlarge", HVM64),
    ("r3.2xlarge", HVM64),
    ("r3.4xlarge", HVM64),
    ("r3.8xlarge", HVM64),
    ("i2.xlarge", HVM64),
    ("i2.2xlarge", HVM64),
    ("i2.4xlarge", HVM64),
    ("i2.8xlarge", HVM64),
    ("d2.xlarge", HVM64),
    ("d2.2xlarge", HVM64),
];

/// Region, HVM64 AMI, HVMG2 AMI.
pub const REGION_AMIS: [(&str, &str, &str); 23] = [
    ("af-south-1", "ami-064cc455f8a1ef504", NOT_SUPPORTED),
    ("ap-east-1", "ami-f85b1989", NOT_SUPPORTED),
    ("ap-northeast-1", "ami-0b2c2a754d5b4da22", "ami-09d0e0e099ecabba2"),
    ("ap-northeast-2", "ami-0493ab99920f410fc", NOT_SUPPORTED),
    ("ap-northeast-3", "ami-01344f6f63a4decc1", NOT_SUPPORTED),
    ("ap-south-1", "ami-03cfb5e1fb4fac428", "ami-0244c1d42815af84a"),
    ("ap-southeast-1", "ami-0ba35dc9caf73d1c7", "ami-0e46ce0d6a87dc979"),
    ("ap-southeast-2", "ami-0ae99b503e8694028", "ami-0c0ab057a101d8ff2"),
    ("ca-central-1", "ami-0803e21a2ec22f953", NOT_SUPPORTED),
    ("cn-north-1", "ami-07a3f215cc90c889c", NOT_SUPPORTED),
    ("cn-northwest-1", "ami-0a3b3b10f714a0ff4", NOT_SUPPORTED),
    ("eu-central-1", "ami-0474863011a7d1541", "ami-0aa1822e3eb913a11"),
    ("eu-north-1", "ami-0de4b8910494dba0f", "ami-32d55b4c"),
    ("eu-south-1", "ami-08427144fe9ebdef6", NOT_SUPPORTED),
    ("eu-west-1", "ami-015232c01a82b847b", "ami-0d5299b1c6112c3c7"),
    ("eu-west-2", "ami-0765d48d7e15beb93", NOT_SUPPORTED),
    ("eu-west-3", "ami-0caf07637eda19d9c", NOT_SUPPORTED),
    ("me-south-1", "ami-0744743d80915b497", NOT_SUPPORTED),
    ("sa-east-1", "ami-0a52e8a6018e92bb0", NOT_SUPPORTED),
    ("us-east-1", "ami-0c6b1d09930fac512", "ami-0b6c0d1e31e0fe2c2"),
    ("us-east-2", "ami-0ebbf2179e615c338", NOT_SUPPORTED),
    ("us-west-1", "ami-015954d5e5548d13b", NOT_SUPPORTED),
    ("us-west-2", "ami-0352d5a37fb4f603f", "ami-0c9afd0ac6d05b532"),
];

pub fn instance_type_names() -> impl Iterator<Item = &'static str> {
    INSTANCE_TYPES.iter().map(|(name, _)| *name)
}

pub fn instance_type_to_arch() -> Mapping {
    INSTANCE_TYPES
        .iter()
        .fold(Mapping::new(), |mapping, (name, arch)| {
            mapping.entry(*name, ARCH_KEY, *arch)
        })
}

pub fn instance_type_to_nat_arch() -> Mapping {
    INSTANCE_TYPES
        .iter()
        .fold(Mapping::new(), |mapping, (name, _)| {
            mapping.entry(*name, ARCH_KEY, NAT_HVM64)
        })
}

pub fn region_arch_to_ami() -> Mapping {
    REGION_AMIS
        .iter()
        .fold(Mapping::new(), |mapping, (region, hvm64, hvmg2)| {
            mapping
                .entry(*region, HVM64, *hvm64)
                .entry(*region, HVMG2, *hvmg2)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_instance_type_has_an_arch_and_a_nat_arch() {
        let arch = instance_type_to_arch();
        let nat = instance_type_to_nat_arch();

        for name in instance_type_names() {
            assert_eq!(true, arch.lookup(name, ARCH_KEY).is_some(), "{}", name);
            assert_eq!(Some(NAT_HVM64), nat.lookup(name, ARCH_KEY), "{}", name);
        }
        assert_eq!(INSTANCE_TYPES.len(), arch.len());
    }

    #[test]
    fn every_region_carries_every_arch() {
        let amis = region_arch_to_ami();
        let arch = instance_type_to_arch();

        for region in amis.top_keys() {
            for value in arch.column(ARCH_KEY) {
                assert_eq!(true, amis.lookup(region, value).is_some(), "{} {}", region, value);
            }
        }
    }

    #[test]
    fn regions_are_unique() {
        assert_eq!(REGION_AMIS.len(), region_arch_to_ami().len());
    }
}
