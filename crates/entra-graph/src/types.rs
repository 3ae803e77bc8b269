//! Directory entity types and query descriptions.
//!
//! Every entity field is optional: the Graph API omits properties that
//! are unset or not selected, and the renderers substitute placeholders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default page size for list queries.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Properties selected for user list queries.
pub const USER_FIELDS: &[&str] = &[
    "id",
    "userPrincipalName",
    "displayName",
    "accountEnabled",
    "userType",
    "creationType",
];

/// Properties selected for device list queries.
pub const DEVICE_FIELDS: &[&str] = &[
    "id",
    "displayName",
    "operatingSystem",
    "operatingSystemVersion",
    "accountEnabled",
    "trustType",
    "enrollmentType",
    "deviceCategory",
    "managementType",
    "registrationDateTime",
];

/// Directory object collections that can be counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Users,
    Devices,
    Applications,
    ServicePrincipals,
    Groups,
}

impl EntityKind {
    /// All countable kinds, in reporting order.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Users,
        EntityKind::Devices,
        EntityKind::Applications,
        EntityKind::ServicePrincipals,
        EntityKind::Groups,
    ];

    /// Collection path relative to the Graph base URL.
    pub fn path(self) -> &'static str {
        match self {
            EntityKind::Users => "users",
            EntityKind::Devices => "devices",
            EntityKind::Applications => "applications",
            EntityKind::ServicePrincipals => "servicePrincipals",
            EntityKind::Groups => "groups",
        }
    }

    /// Statistic name used in the `metric` label of `entraid_stats`.
    pub fn stat_name(self) -> &'static str {
        match self {
            EntityKind::Users => "user_count",
            EntityKind::Devices => "device_count",
            EntityKind::Applications => "application_count",
            EntityKind::ServicePrincipals => "service_principal_count",
            EntityKind::Groups => "group_count",
        }
    }
}

/// A user as returned by `GET /users?$select=...`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: Option<String>,
    pub user_principal_name: Option<String>,
    pub display_name: Option<String>,
    pub account_enabled: Option<bool>,
    pub user_type: Option<String>,
    pub creation_type: Option<String>,
}

/// A device as returned by `GET /devices?$select=...`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub device_category: Option<String>,
    pub operating_system: Option<String>,
    pub operating_system_version: Option<String>,
    pub trust_type: Option<String>,
    pub enrollment_type: Option<String>,
    pub account_enabled: Option<bool>,
    pub management_type: Option<String>,
    pub registration_date_time: Option<DateTime<Utc>>,
}

/// One page of an OData collection response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    /// Continuation URL; absent on the last page.
    #[serde(rename = "@odata.nextLink", default, skip_serializing_if = "Option::is_none")]
    pub next_link: Option<String>,
}

impl<T> Page<T> {
    /// A final page.
    pub fn last(value: Vec<T>) -> Self {
        Self {
            value,
            next_link: None,
        }
    }

    /// A page followed by `next_link`.
    pub fn with_next(value: Vec<T>, next_link: impl Into<String>) -> Self {
        Self {
            value,
            next_link: Some(next_link.into()),
        }
    }

    /// The continuation token, treating empty strings as absent.
    pub fn next(&self) -> Option<&str> {
        self.next_link.as_deref().filter(|l| !l.is_empty())
    }
}

/// A paginated list query: which fields, how many per page, which filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub select: Vec<&'static str>,
    pub top: u32,
    pub filter: Option<String>,
}

impl ListQuery {
    pub fn new(select: &[&'static str]) -> Self {
        Self {
            select: select.to_vec(),
            top: DEFAULT_PAGE_SIZE,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: Option<&str>) -> Self {
        self.filter = filter.map(str::to_string);
        self
    }

    /// OData query parameters for the first page.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("$select", self.select.join(",")),
            ("$top", self.top.to_string()),
        ];
        if let Some(filter) = &self.filter {
            params.push(("$filter", filter.clone()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_user_page_with_missing_fields() {
        let json = r#"{
            "@odata.context": "https://graph.microsoft.com/v1.0/$metadata#users",
            "@odata.nextLink": "https://graph.microsoft.com/v1.0/users?$skiptoken=abc",
            "value": [
                {"id": "u1", "userPrincipalName": "a@contoso.com", "displayName": "A",
                 "accountEnabled": true, "userType": "Member", "creationType": null},
                {"id": "u2"}
            ]
        }"#;
        let page: Page<UserRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(page.value.len(), 2);
        assert_eq!(page.value[0].account_enabled, Some(true));
        assert_eq!(page.value[0].creation_type, None);
        assert_eq!(page.value[1].display_name, None);
        assert_eq!(
            page.next(),
            Some("https://graph.microsoft.com/v1.0/users?$skiptoken=abc")
        );
    }

    #[test]
    fn decode_device_registration_time() {
        let json = r#"{"value": [{"id": "d1", "registrationDateTime": "2024-01-02T03:04:05Z"}]}"#;
        let page: Page<DeviceRecord> = serde_json::from_str(json).unwrap();
        let ts = page.value[0].registration_date_time.unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-02T03:04:05+00:00");
        assert_eq!(page.next(), None);
    }

    #[test]
    fn empty_next_link_ends_pagination() {
        let page: Page<UserRecord> = Page::with_next(vec![], "");
        assert_eq!(page.next(), None);
    }

    #[test]
    fn missing_value_decodes_as_empty() {
        let page: Page<UserRecord> = serde_json::from_str("{}").unwrap();
        assert!(page.value.is_empty());
    }

    #[test]
    fn query_params_include_filter_only_when_set() {
        let query = ListQuery::new(USER_FIELDS);
        let params = query.params();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].1, USER_FIELDS.join(","));
        assert_eq!(params[1], ("$top", "100".to_string()));

        let filtered = ListQuery::new(DEVICE_FIELDS).with_filter(Some("trustType eq 'AzureAd'"));
        assert!(filtered
            .params()
            .contains(&("$filter", "trustType eq 'AzureAd'".to_string())));
    }

    #[test]
    fn stat_names_are_stable() {
        let names: Vec<_> = EntityKind::ALL.iter().map(|k| k.stat_name()).collect();
        assert_eq!(
            names,
            vec![
                "user_count",
                "device_count",
                "application_count",
                "service_principal_count",
                "group_count"
            ]
        );
    }
}
