// Role capability table
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Owner,
    Manager,
    Supervisor,
    Receptionist,
    Cashier,
    Technician,
    #[serde(rename = "Spa Expert")]
    SpaExpert,
}

impl Role {
    pub const ALL: [Role; 8] = [
        Role::Admin,
        Role::Owner,
        Role::Manager,
        Role::Supervisor,
        Role::Receptionist,
        Role::Cashier,
        Role::Technician,
        Role::SpaExpert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Owner => "Owner",
            Role::Manager => "Manager",
            Role::Supervisor => "Supervisor",
            Role::Receptionist => "Receptionist",
            Role::Cashier => "Cashier",
            Role::Technician => "Technician",
            Role::SpaExpert => "Spa Expert",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim();
        Role::ALL
            .into_iter()
            .find(|role| {
                role.as_str().eq_ignore_ascii_case(normalized)
                    || role.as_str().replace(' ', "").eq_ignore_ascii_case(normalized)
                    || role.as_str().replace(' ', "_").eq_ignore_ascii_case(normalized)
            })
            .ok_or_else(|| UnknownRole(normalized.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ViewTickets,
    ViewAllTickets,
    ViewTipReport,
    ViewAllTipReport,
    ViewTipReportUnlimitedHistory,
    TriggerAutoApproval,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::ViewTickets => "view tickets",
            Action::ViewAllTickets => "view all tickets",
            Action::ViewTipReport => "view the tip report",
            Action::ViewAllTipReport => "view every technician's tips",
            Action::ViewTipReportUnlimitedHistory => "view tip history beyond the recent window",
            Action::TriggerAutoApproval => "run ticket auto-approval",
        };
        f.write_str(name)
    }
}

/// Whether `role` may perform `action`.
pub fn capability(role: Role, action: Action) -> bool {
    use Role::*;

    let allowed: &[Role] = match action {
        Action::ViewTickets => &[
            Admin, Owner, Manager, Supervisor, Receptionist, Cashier, Technician, SpaExpert,
        ],
        Action::ViewAllTickets => &[Admin, Owner, Manager, Supervisor, Receptionist, Cashier],
        Action::ViewTipReport => &[
            Admin, Owner, Manager, Supervisor, Receptionist, Technician, SpaExpert,
        ],
        Action::ViewAllTipReport => &[Admin, Owner, Manager, Supervisor, Receptionist],
        Action::ViewTipReportUnlimitedHistory | Action::TriggerAutoApproval => {
            &[Admin, Owner, Manager]
        }
    };

    allowed.contains(&role)
}

pub fn can_any(roles: &[Role], action: Action) -> bool {
    roles.iter().any(|role| capability(*role, action))
}
