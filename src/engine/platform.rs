use regex::Regex;
use std::sync::LazyLock;

pub const UNKNOWN_PLATFORM: &str = "unknown";

static PLATFORM_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[-_.])(aws|azure|gcp|metal|openstack|ovirt|vsphere|libvirt)(?:$|[-_.])")
        .expect("Invalid platform regex")
});

/// Platform a job runs on, from its explicit platform or its name.
pub fn platform_of(job_name: &str, explicit: Option<&str>) -> String {
    if let Some(platform) = explicit.map(str::trim).filter(|p| !p.is_empty()) {
        return platform.to_string();
    }

    PLATFORM_TOKEN
        .captures(job_name)
        .and_then(|caps| caps.get(1))
        .map_or_else(
            || UNKNOWN_PLATFORM.to_string(),
            |m| m.as_str().to_ascii_lowercase(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_from_job_name() {
        assert_eq!(
            platform_of("release-openshift-ocp-installer-e2e-aws-serial-4.6", None),
            "aws"
        );
        assert_eq!(platform_of("periodic-ci-e2e-metal-ipi", None), "metal");
        assert_eq!(platform_of("e2e-GCP", None), "gcp");
    }

    #[test]
    fn test_platform_requires_token_boundary() {
        assert_eq!(platform_of("e2e-awsome-suite", None), UNKNOWN_PLATFORM);
        assert_eq!(platform_of("unit", None), UNKNOWN_PLATFORM);
    }

    #[test]
    fn test_explicit_platform_wins() {
        assert_eq!(platform_of("e2e-aws", Some("azure")), "azure");
    }

    #[test]
    fn test_blank_explicit_platform_falls_back_to_name() {
        assert_eq!(platform_of("e2e-vsphere-upi", Some("  ")), "vsphere");
    }
}
