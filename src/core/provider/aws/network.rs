//! EC2 network discovery.

use serde_json::Value;

use super::{array, str_field, AwsCli};
use crate::core::domain::Subnet;
use crate::core::provider::NetworkProvider;
use crate::error::Result;

impl NetworkProvider for AwsCli {
    fn find_network(&self, key: &str, value: &str) -> Result<Option<String>> {
        let filter = format!("Name=tag:{},Values={}", key, value);
        let response = self.json(&["ec2", "describe-vpcs", "--filters", filter.as_str()])?;
        Ok(parse_vpcs(&response).into_iter().next())
    }

    fn list_networks(&self) -> Result<Vec<String>> {
        let response = self.json(&["ec2", "describe-vpcs"])?;
        Ok(parse_vpcs(&response))
    }

    fn list_subnets(&self, network_id: &str) -> Result<Vec<Subnet>> {
        let filter = format!("Name=vpc-id,Values={}", network_id);
        let response = self.json(&["ec2", "describe-subnets", "--filters", filter.as_str()])?;
        Ok(parse_subnets(&response))
    }
}

fn parse_vpcs(response: &Value) -> Vec<String> {
    array(response, "Vpcs")
        .iter()
        .filter_map(|v| str_field(v, "VpcId"))
        .collect()
}

fn parse_subnets(response: &Value) -> Vec<Subnet> {
    array(response, "Subnets")
        .iter()
        .filter_map(|s| {
            Some(Subnet {
                id: str_field(s, "SubnetId")?,
                public: s
                    .get("MapPublicIpOnLaunch")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            })
        })
        .collect()
}
