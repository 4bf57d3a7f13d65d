//! Validation functions for HDInsight attributes
//!
//! All functions use the classic `(warnings, errors)` shape so they slot
//! into schemas through `tfplug::validator::ValidateFn`.

use tfplug::types::Dynamic;

pub fn hdinsight_name(value: &Dynamic, key: &str) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();

    if let Some(v) = value.as_str() {
        // The name must be 3-59 characters, begin with a letter, end with a
        // letter or number, and may contain only letters, numbers and hyphens.
        let len_ok = (3..=59).contains(&v.len());
        let starts_ok = v.chars().next().map(|c| c.is_ascii_alphabetic()).unwrap_or(false);
        let ends_ok = v.chars().last().map(|c| c.is_ascii_alphanumeric()).unwrap_or(false);
        let chars_ok = v.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');

        if !(len_ok && starts_ok && ends_ok && chars_ok) {
            errors.push(format!(
                "{} must be 3 - 59 characters long, begin with a letter, end with a letter or number and can contain only letters, numbers and hyphens (got {:?})",
                key, v
            ));
        }
    }

    (Vec::new(), errors)
}

pub fn hdinsight_cluster_version(value: &Dynamic, key: &str) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();

    if let Some(v) = value.as_str() {
        let well_formed = regex::Regex::new(r"^\d+(\.\d+)+$")
            .expect("static regex")
            .is_match(v);
        if !well_formed {
            errors.push(format!(
                "{} must be a version in the format `major.minor` (got {:?})",
                key, v
            ));
        }
    }

    (Vec::new(), errors)
}

/// LDAPS endpoints of a domain-joined cluster must use the ldaps scheme.
pub fn hdinsight_cluster_ldaps_urls(value: &Dynamic, key: &str) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();

    if let Some(v) = value.as_str() {
        match url::Url::parse(v) {
            Ok(uri) if uri.scheme() == "ldaps" => {}
            Ok(uri) => errors.push(format!(
                "{} must be a `ldaps` URL, got scheme {:?} in {:?}",
                key,
                uri.scheme(),
                v
            )),
            Err(e) => errors.push(format!("{} is not a valid URL ({:?}): {}", key, v, e)),
        }
    }

    (Vec::new(), errors)
}

// VM sizes supported for HDInsight node definitions. Compared
// case-insensitively because the API normalizes casing.
const NODE_DEFINITION_VM_SIZES: &[&str] = &[
    "ExtraSmall",
    "Small",
    "Medium",
    "Large",
    "ExtraLarge",
    "A5",
    "A6",
    "A7",
    "A8",
    "A9",
    "A10",
    "A11",
    "Standard_A1_V2",
    "Standard_A2_V2",
    "Standard_A2m_V2",
    "Standard_A3",
    "Standard_A4_V2",
    "Standard_A4m_V2",
    "Standard_A8_V2",
    "Standard_A8m_V2",
    "Standard_D1",
    "Standard_D2",
    "Standard_D3",
    "Standard_D4",
    "Standard_D11",
    "Standard_D12",
    "Standard_D13",
    "Standard_D14",
    "Standard_D1_V2",
    "Standard_D2_V2",
    "Standard_D3_V2",
    "Standard_D4_V2",
    "Standard_D5_V2",
    "Standard_D11_V2",
    "Standard_D12_V2",
    "Standard_D13_V2",
    "Standard_D14_V2",
    "Standard_DS1_V2",
    "Standard_DS2_V2",
    "Standard_DS3_V2",
    "Standard_DS4_V2",
    "Standard_DS5_V2",
    "Standard_DS11_V2",
    "Standard_DS12_V2",
    "Standard_DS13_V2",
    "Standard_DS14_V2",
    "Standard_E2_V3",
    "Standard_E4_V3",
    "Standard_E8_V3",
    "Standard_E16_V3",
    "Standard_E20_V3",
    "Standard_E32_V3",
    "Standard_E64_V3",
    "Standard_E64i_V3",
    "Standard_E2s_V3",
    "Standard_E4s_V3",
    "Standard_E8s_V3",
    "Standard_E16s_V3",
    "Standard_E20s_V3",
    "Standard_E32s_V3",
    "Standard_E64s_V3",
    "Standard_E64is_V3",
    "Standard_F2s_V2",
    "Standard_F4s_V2",
    "Standard_F8s_V2",
    "Standard_F16s_V2",
    "Standard_F32s_V2",
    "Standard_F64s_V2",
    "Standard_F72s_V2",
    "Standard_G1",
    "Standard_G2",
    "Standard_G3",
    "Standard_G4",
    "Standard_G5",
    "Standard_GS1",
    "Standard_GS2",
    "Standard_GS3",
    "Standard_GS4",
    "Standard_GS5",
    "Standard_L4s",
    "Standard_L8s",
    "Standard_L16s",
    "Standard_L32s",
    "Standard_NC6",
    "Standard_NC12",
    "Standard_NC24",
    "Standard_NC24r",
    "Standard_NV6",
    "Standard_NV12",
    "Standard_NV24",
];

pub fn node_definition_vm_size(value: &Dynamic, key: &str) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();

    if let Some(v) = value.as_str() {
        let known = NODE_DEFINITION_VM_SIZES
            .iter()
            .any(|size| size.eq_ignore_ascii_case(v));
        if !known {
            errors.push(format!("{} is not a supported HDInsight VM size: {:?}", key, v));
        }
    }

    (Vec::new(), errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors_for(f: fn(&Dynamic, &str) -> (Vec<String>, Vec<String>), value: &str) -> Vec<String> {
        let (_, errors) = f(&Dynamic::String(value.to_string()), "k");
        errors
    }

    #[test]
    fn hdinsight_name_accepts_valid_names() {
        assert!(errors_for(hdinsight_name, "acctesthdi-123").is_empty());
        assert!(errors_for(hdinsight_name, "abc").is_empty());
    }

    #[test]
    fn hdinsight_name_rejects_invalid_names() {
        assert!(!errors_for(hdinsight_name, "ab").is_empty());
        assert!(!errors_for(hdinsight_name, "1starts-with-number").is_empty());
        assert!(!errors_for(hdinsight_name, "ends-with-hyphen-").is_empty());
        assert!(!errors_for(hdinsight_name, "has_underscore").is_empty());
    }

    #[test]
    fn cluster_version_requires_major_minor() {
        assert!(errors_for(hdinsight_cluster_version, "3.6").is_empty());
        assert!(errors_for(hdinsight_cluster_version, "3.6.1000.67").is_empty());
        assert!(!errors_for(hdinsight_cluster_version, "3").is_empty());
        assert!(!errors_for(hdinsight_cluster_version, "three.six").is_empty());
    }

    #[test]
    fn ldaps_urls_require_ldaps_scheme() {
        assert!(!errors_for(hdinsight_cluster_ldaps_urls, "http://x").is_empty());
        assert!(errors_for(hdinsight_cluster_ldaps_urls, "ldaps://x").is_empty());
        assert!(!errors_for(hdinsight_cluster_ldaps_urls, "not a url").is_empty());
    }

    #[test]
    fn vm_size_is_case_insensitive() {
        assert!(errors_for(node_definition_vm_size, "Standard_D3_V2").is_empty());
        assert!(errors_for(node_definition_vm_size, "standard_d3_v2").is_empty());
        assert!(!errors_for(node_definition_vm_size, "Standard_X99").is_empty());
    }
}
