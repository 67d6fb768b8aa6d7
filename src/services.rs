//! Catalog of user-facing services and their backend mapping.
//!
//! One table shared by the submission path and the display layer, so the
//! two can never drift apart.

/// One selectable backend service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceInfo {
    /// User-facing identifier.
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Name the backend expects in `service_name`.
    pub api_name: &'static str,
    /// Filter category sent with search submissions.
    pub category: &'static str,
}

pub const SERVICES: &[ServiceInfo] = &[
    ServiceInfo {
        id: "company-policies",
        name: "Company Policies",
        description: "Internal policies, procedures and organizational information",
        api_name: "work-internal",
        category: "policies",
    },
    ServiceInfo {
        id: "employee-directory",
        name: "Employee Directory",
        description: "Employee records and contact information",
        api_name: "workers-info",
        category: "employees",
    },
    ServiceInfo {
        id: "financial-analytics",
        name: "Financial Analytics",
        description: "Analysis and forecasting over financial data",
        api_name: "financial-analytics",
        category: "general",
    },
];

pub fn all() -> &'static [ServiceInfo] {
    SERVICES
}

pub fn get(id: &str) -> Option<&'static ServiceInfo> {
    SERVICES.iter().find(|s| s.id == id)
}

/// Display info for an id, falling back to the first entry for unknown ids.
pub fn get_or_default(id: &str) -> &'static ServiceInfo {
    get(id).unwrap_or(&SERVICES[0])
}

/// Backend-facing name for a service id. Unknown ids pass through unchanged;
/// the backend stays the authority on what exists.
pub fn api_name(id: &str) -> &str {
    get(id).map(|s| s.api_name).unwrap_or(id)
}

/// Filter category for a service id, `general` for anything unknown.
pub fn category(id: &str) -> &'static str {
    get(id).map(|s| s.category).unwrap_or("general")
}
