//! Azure resource ID parsing and formatting
//!
//! Resource IDs are the strings Terraform stores as `id`:
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{ns}/{type}/{name}[/{childType}/{childName}]`.
//! Segment keys are matched case-sensitively as ARM emits them.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError(String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parsing Azure resource ID: {}", self.0)
    }
}

impl std::error::Error for ParseError {}

/// Decomposed resource ID; typed IDs are built on top of this.
#[derive(Debug, Clone, PartialEq)]
pub struct AzureResourceId {
    pub subscription_id: String,
    pub resource_group: String,
    pub provider: String,
    /// Path pairs after the provider, in order: `[(type, name), ...]`
    pub components: Vec<(String, String)>,
}

impl AzureResourceId {
    pub fn parse(id: &str) -> Result<Self, ParseError> {
        let trimmed = id.trim_start_matches('/').trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ParseError(format!("ID is empty: {:?}", id)));
        }

        let segments: Vec<&str> = trimmed.split('/').collect();
        if segments.len() % 2 != 0 {
            return Err(ParseError(format!(
                "ID has an odd number of segments: {:?}",
                id
            )));
        }

        let mut subscription_id = None;
        let mut resource_group = None;
        let mut provider = None;
        let mut components = Vec::new();

        let mut pairs = segments.chunks(2);
        while let Some([key, value]) = pairs.next() {
            if value.is_empty() {
                return Err(ParseError(format!("segment '{}' has no value: {:?}", key, id)));
            }
            match *key {
                "subscriptions" => subscription_id = Some(value.to_string()),
                "resourceGroups" => resource_group = Some(value.to_string()),
                "providers" => provider = Some(value.to_string()),
                _ => components.push((key.to_string(), value.to_string())),
            }
        }

        Ok(Self {
            subscription_id: subscription_id
                .ok_or_else(|| ParseError(format!("ID is missing the 'subscriptions' segment: {:?}", id)))?,
            resource_group: resource_group
                .ok_or_else(|| ParseError(format!("ID is missing the 'resourceGroups' segment: {:?}", id)))?,
            provider: provider
                .ok_or_else(|| ParseError(format!("ID is missing the 'providers' segment: {:?}", id)))?,
            components,
        })
    }

    fn expect_provider(&self, provider: &str, id: &str) -> Result<(), ParseError> {
        if self.provider != provider {
            return Err(ParseError(format!(
                "expected provider {} but got {}: {:?}",
                provider, self.provider, id
            )));
        }
        Ok(())
    }

    fn component(&self, index: usize, key: &str, id: &str) -> Result<String, ParseError> {
        match self.components.get(index) {
            Some((k, v)) if k == key => Ok(v.clone()),
            Some((k, _)) => Err(ParseError(format!(
                "expected segment '{}' but got '{}': {:?}",
                key, k, id
            ))),
            None => Err(ParseError(format!("ID is missing the '{}' segment: {:?}", key, id))),
        }
    }
}

/// `Microsoft.HDInsight/clusters/{name}`
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterId {
    pub subscription_id: String,
    pub resource_group: String,
    pub name: String,
}

impl ClusterId {
    pub fn new(subscription_id: &str, resource_group: &str, name: &str) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            name: name.to_string(),
        }
    }

    pub fn parse(id: &str) -> Result<Self, ParseError> {
        let raw = AzureResourceId::parse(id)?;
        raw.expect_provider("Microsoft.HDInsight", id)?;
        Ok(Self {
            name: raw.component(0, "clusters", id)?,
            subscription_id: raw.subscription_id,
            resource_group: raw.resource_group,
        })
    }

    pub fn id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.HDInsight/clusters/{}",
            self.subscription_id, self.resource_group, self.name
        )
    }
}

/// `Microsoft.Network/trafficManagerProfiles/{name}`
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficManagerProfileId {
    pub subscription_id: String,
    pub resource_group: String,
    pub name: String,
}

impl TrafficManagerProfileId {
    pub fn new(subscription_id: &str, resource_group: &str, name: &str) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            name: name.to_string(),
        }
    }

    pub fn parse(id: &str) -> Result<Self, ParseError> {
        let raw = AzureResourceId::parse(id)?;
        raw.expect_provider("Microsoft.Network", id)?;
        Ok(Self {
            name: raw.component(0, "trafficManagerProfiles", id)?,
            subscription_id: raw.subscription_id,
            resource_group: raw.resource_group,
        })
    }

    pub fn id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/trafficManagerProfiles/{}",
            self.subscription_id, self.resource_group, self.name
        )
    }
}

/// `Microsoft.Network/trafficManagerProfiles/{profile}/{endpointType}/{name}`
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficManagerEndpointId {
    pub subscription_id: String,
    pub resource_group: String,
    pub profile_name: String,
    pub endpoint_type: String,
    pub name: String,
}

impl TrafficManagerEndpointId {
    pub fn new(
        subscription_id: &str,
        resource_group: &str,
        profile_name: &str,
        endpoint_type: &str,
        name: &str,
    ) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            profile_name: profile_name.to_string(),
            endpoint_type: endpoint_type.to_string(),
            name: name.to_string(),
        }
    }

    pub fn parse(id: &str) -> Result<Self, ParseError> {
        let raw = AzureResourceId::parse(id)?;
        raw.expect_provider("Microsoft.Network", id)?;
        let profile_name = raw.component(0, "trafficManagerProfiles", id)?;
        let (endpoint_type, name) = match raw.components.get(1) {
            Some((k, v)) => (k.clone(), v.clone()),
            None => {
                return Err(ParseError(format!(
                    "ID is missing the endpoint type and name segments: {:?}",
                    id
                )))
            }
        };
        Ok(Self {
            subscription_id: raw.subscription_id,
            resource_group: raw.resource_group,
            profile_name,
            endpoint_type,
            name,
        })
    }

    pub fn id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/trafficManagerProfiles/{}/{}/{}",
            self.subscription_id, self.resource_group, self.profile_name, self.endpoint_type, self.name
        )
    }
}
