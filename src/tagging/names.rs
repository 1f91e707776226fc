//! Resource names
//!
//! Canonical (`//service.googleapis.com/...`) resource names and the two
//! tag-binding name encodings:
//!
//! - the display encoding, `tagBindings/<resource with '/' -> '@'>@<tag value with '/' -> '@'>`
//! - the REST path, `tagBindings/<resource with '/' -> '%2F'>/<tag value>`
//!
//! They are not interchangeable. Everything here is pure string work.

use crate::error::{Result, TagError};
use std::fmt;
use std::str::FromStr;

pub const TAG_BINDINGS_PREFIX: &str = "tagBindings/";

const TAG_VALUES_SEGMENT: &str = "@tagValues@";

/// Resource types with a known canonical name template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Instance,
    Disk,
    Project,
    Bucket,
    Dataset,
    Table,
    SqlInstance,
    GkeCluster,
}

impl ResourceKind {
    pub const ALL: &'static [ResourceKind] = &[
        Self::Instance,
        Self::Disk,
        Self::Project,
        Self::Bucket,
        Self::Dataset,
        Self::Table,
        Self::SqlInstance,
        Self::GkeCluster,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::Disk => "disk",
            Self::Project => "project",
            Self::Bucket => "bucket",
            Self::Dataset => "dataset",
            Self::Table => "table",
            Self::SqlInstance => "sql-instance",
            Self::GkeCluster => "gke-cluster",
        }
    }

    /// Names of the parts the template expects, in order
    pub fn part_names(&self) -> &'static [&'static str] {
        match self {
            Self::Instance => &["project", "zone", "instance"],
            Self::Disk => &["project", "zone", "disk"],
            Self::Project => &["project"],
            Self::Bucket => &["bucket"],
            Self::Dataset => &["project", "dataset"],
            Self::Table => &["project", "dataset", "table"],
            Self::SqlInstance => &["project", "instance"],
            Self::GkeCluster => &["project", "location", "cluster"],
        }
    }

    /// Fill the template. Only the number of parts is checked, never their
    /// contents.
    pub fn format(&self, parts: &[&str]) -> Result<String> {
        let expected = self.part_names();
        if parts.len() != expected.len() {
            return Err(TagError::Argument(format!(
                "{} takes {} part(s) ({}), got {}",
                self,
                expected.len(),
                expected.join(", "),
                parts.len()
            )));
        }

        let name = match (self, parts) {
            (Self::Instance, [p, z, i]) => {
                format!("//compute.googleapis.com/projects/{p}/zones/{z}/instances/{i}")
            }
            (Self::Disk, [p, z, d]) => {
                format!("//compute.googleapis.com/projects/{p}/zones/{z}/disks/{d}")
            }
            (Self::Project, [p]) => format!("//cloudresourcemanager.googleapis.com/projects/{p}"),
            (Self::Bucket, [b]) => format!("//storage.googleapis.com/projects/_/buckets/{b}"),
            (Self::Dataset, [p, d]) => format!("//bigquery.googleapis.com/projects/{p}/datasets/{d}"),
            (Self::Table, [p, d, t]) => {
                format!("//bigquery.googleapis.com/projects/{p}/datasets/{d}/tables/{t}")
            }
            (Self::SqlInstance, [p, i]) => format!("//sqladmin.googleapis.com/projects/{p}/instances/{i}"),
            (Self::GkeCluster, [p, l, c]) => {
                format!("//container.googleapis.com/projects/{p}/locations/{l}/clusters/{c}")
            }
            _ => unreachable!("arity checked above"),
        };

        Ok(name)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_lowercase();
        let kind = match lower.as_str() {
            "instance" | "vm" => Self::Instance,
            "disk" => Self::Disk,
            "project" => Self::Project,
            "bucket" => Self::Bucket,
            "dataset" => Self::Dataset,
            "table" => Self::Table,
            "sql-instance" | "sql" => Self::SqlInstance,
            "gke-cluster" | "cluster" => Self::GkeCluster,
            _ => {
                let known: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                return Err(TagError::Argument(format!(
                    "unknown resource kind '{}' (expected one of: {})",
                    s,
                    known.join(", ")
                )));
            }
        };
        Ok(kind)
    }
}

/// Canonical resource name for `kind` built from `parts`
pub fn format_resource_name(kind: ResourceKind, parts: &[&str]) -> Result<String> {
    kind.format(parts)
}

/// Display encoding of a binding, e.g.
/// `tagBindings/compute.googleapis.com@projects@p@zones@z@instances@i@tagValues@123`
pub fn encode_tag_binding_name(resource_name: &str, tag_value_name: &str) -> String {
    let resource = resource_name.strip_prefix("//").unwrap_or(resource_name);
    format!(
        "{}{}@{}",
        TAG_BINDINGS_PREFIX,
        resource.replace('/', "@"),
        tag_value_name.replace('/', "@")
    )
}

/// Reverse of [`encode_tag_binding_name`] for tag values of the form
/// `tagValues/<id>`. Returns `(resource_name, tag_value)`.
pub fn decode_tag_binding_name(name: &str) -> Option<(String, String)> {
    let encoded = name.strip_prefix(TAG_BINDINGS_PREFIX)?;
    let split = encoded.rfind(TAG_VALUES_SEGMENT)?;
    let (resource, tag_value) = encoded.split_at(split);
    if resource.is_empty() || resource.contains('/') {
        return None;
    }

    let tag_value = &tag_value[1..];
    Some((
        format!("//{}", resource.replace('@', "/")),
        tag_value.replace('@', "/"),
    ))
}

/// REST path addressing the binding of `tag_value_name` on `resource_name`.
/// Every '/' of the resource name becomes `%2F`; the tag value is kept as is.
pub fn tag_binding_path(resource_name: &str, tag_value_name: &str) -> String {
    format!(
        "{}{}/{}",
        TAG_BINDINGS_PREFIX,
        resource_name.replace('/', "%2F"),
        tag_value_name
    )
}

/// Prefix a bare binding id with `tagBindings/`
pub fn qualify_tag_binding_name(name: &str) -> String {
    if name.starts_with(TAG_BINDINGS_PREFIX) {
        name.to_string()
    } else {
        format!("{}{}", TAG_BINDINGS_PREFIX, name)
    }
}

/// Drop a `/compute/v1` segment some callers copy from Compute API self-links
pub fn normalize_resource_name(resource_name: &str) -> String {
    const SEGMENT: &str = "/compute/v1";

    let mut out = String::with_capacity(resource_name.len());
    let mut rest = resource_name;
    while let Some(idx) = rest.find(SEGMENT) {
        let after = &rest[idx + SEGMENT.len()..];
        if after.is_empty() || after.starts_with('/') {
            out.push_str(&rest[..idx]);
        } else {
            out.push_str(&rest[..idx + SEGMENT.len()]);
        }
        rest = after;
    }
    out.push_str(rest);
    out
}
