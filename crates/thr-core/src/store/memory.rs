// ── In-process registry store ──
//
// Applies the same scope/search/order/limit semantics as the remote
// store. Backs the unit tests and `thr-tui --demo`.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{ControlOrder, ControlQuery, RegistryStore, Scope};
use crate::error::CoreError;
use crate::model::{
    Control, ControlId, FamilyId, Technology, TechnologyFamily, TechnologyId,
};
use crate::sort::{Sort, SortColumn, SortDirection};

#[derive(Default)]
struct Tables {
    families: Vec<TechnologyFamily>,
    technologies: Vec<Technology>,
    controls: BTreeMap<ControlId, Control>,
}

impl Tables {
    fn technology(&self, id: &TechnologyId) -> Option<&Technology> {
        self.technologies.iter().find(|t| &t.id == id)
    }

    /// Attach the joined technology/family fields a store read returns.
    fn joined(&self, control: &Control) -> Control {
        let mut out = control.clone();
        if let Some(tech) = self.technology(&control.tech_id) {
            out.technology_title = Some(tech.title.clone());
            out.family_id = Some(tech.family_id.clone());
            out.family_title = self
                .families
                .iter()
                .find(|f| f.id == tech.family_id)
                .map(|f| f.title.clone());
        }
        out
    }
}

/// Registry store held entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(
        families: Vec<TechnologyFamily>,
        technologies: Vec<Technology>,
        controls: Vec<Control>,
    ) -> Self {
        let controls = controls.into_iter().map(|c| (c.id.clone(), c)).collect();
        Self {
            tables: RwLock::new(Tables {
                families,
                technologies,
                controls,
            }),
            calls: AtomicUsize::new(0),
        }
    }

    /// Sample registry used by the console's demo mode.
    pub fn demo() -> Self {
        let (families, technologies, controls) = demo::seed();
        Self::with_data(families, technologies, controls)
    }

    /// Number of store operations served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
    }
}

fn column_value(control: &Control, column: SortColumn) -> &str {
    match column {
        SortColumn::Id => control.id.as_str(),
        SortColumn::ControlFamily => &control.control_family,
        SortColumn::ControlType => &control.control_type,
        SortColumn::Statement => &control.statement,
        SortColumn::ThrCode => &control.thr_code,
    }
}

/// Case-folded text order, like the store's locale collation; exact bytes
/// break ties.
fn collate(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| a.cmp(b))
}

fn compare(a: &Control, b: &Control, order: ControlOrder) -> Ordering {
    match order {
        ControlOrder::RankingThenId => {
            let rank = match (a.ranking, b.ranking) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            rank.then_with(|| a.id.cmp(&b.id))
        }
        ControlOrder::By(Sort { column, direction }) => {
            let primary = collate(column_value(a, column), column_value(b, column));
            let primary = match direction {
                SortDirection::Asc => primary,
                SortDirection::Desc => primary.reverse(),
            };
            primary.then_with(|| a.id.cmp(&b.id))
        }
    }
}

#[async_trait]
impl RegistryStore for MemoryStore {
    async fn list_families(&self) -> Result<Vec<TechnologyFamily>, CoreError> {
        self.record_call();
        let tables = self.tables.read().await;
        let mut families = tables.families.clone();
        families.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(families)
    }

    async fn list_technologies(
        &self,
        family: Option<&FamilyId>,
    ) -> Result<Vec<Technology>, CoreError> {
        self.record_call();
        let tables = self.tables.read().await;
        let mut techs: Vec<Technology> = tables
            .technologies
            .iter()
            .filter(|t| family.is_none_or(|f| &t.family_id == f))
            .cloned()
            .collect();
        techs.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(techs)
    }

    async fn list_controls(&self, query: &ControlQuery) -> Result<Vec<Control>, CoreError> {
        self.record_call();
        let tables = self.tables.read().await;
        let mut rows: Vec<Control> = tables
            .controls
            .values()
            .map(|c| tables.joined(c))
            .filter(|c| match &query.scope {
                Scope::All => true,
                Scope::Technology(tech) => &c.tech_id == tech,
                Scope::Family(family) => c.family_id.as_ref() == Some(family),
            })
            .filter(|c| query.search.as_deref().is_none_or(|term| c.matches_search(term)))
            .collect();
        rows.sort_by(|a, b| compare(a, b, query.order));
        rows.truncate(query.limit);
        Ok(rows)
    }

    async fn get_control(&self, id: &ControlId) -> Result<Option<Control>, CoreError> {
        self.record_call();
        let tables = self.tables.read().await;
        Ok(tables.controls.get(id).map(|c| tables.joined(c)))
    }

    async fn update_control(&self, control: &Control) -> Result<bool, CoreError> {
        self.record_call();
        let mut tables = self.tables.write().await;
        let Some(existing) = tables.controls.get_mut(&control.id) else {
            return Ok(false);
        };
        existing.control_family.clone_from(&control.control_family);
        existing.control_type.clone_from(&control.control_type);
        existing.ranking = control.ranking;
        existing.monitor_id.clone_from(&control.monitor_id);
        existing.description.clone_from(&control.description);
        existing.statement.clone_from(&control.statement);
        existing.recommendation.clone_from(&control.recommendation);
        existing.thr_code.clone_from(&control.thr_code);
        existing.comments.clone_from(&control.comments);
        existing.updated_at = Some(Utc::now());
        Ok(true)
    }

    async fn insert_control(&self, control: &Control) -> Result<(), CoreError> {
        self.record_call();
        let mut tables = self.tables.write().await;
        if tables.controls.contains_key(&control.id) {
            return Err(CoreError::Rejected {
                message: format!("duplicate key: control {} already exists", control.id),
            });
        }
        if tables.technology(&control.tech_id).is_none() {
            return Err(CoreError::Rejected {
                message: format!("unknown technology {}", control.tech_id),
            });
        }
        let now = Utc::now();
        let mut row = control.clone();
        row.family_id = None;
        row.technology_title = None;
        row.family_title = None;
        row.created_at = Some(now);
        row.updated_at = Some(now);
        tables.controls.insert(row.id.clone(), row);
        Ok(())
    }

    async fn delete_control(&self, id: &ControlId) -> Result<(), CoreError> {
        self.record_call();
        self.tables.write().await.controls.remove(id);
        Ok(())
    }
}

// ── Demo data ────────────────────────────────────────────────────────

mod demo {
    use super::*;

    const CATALOG: &[(&str, &str, &[&str])] = &[
        (
            "OS",
            "Operating Systems",
            &[
                "Windows 11",
                "Windows 10",
                "Windows Server 2019",
                "Ubuntu 22.04",
                "Red Hat Enterprise Linux 9",
                "macOS Ventura",
            ],
        ),
        (
            "PLATFORMS",
            "Platforms",
            &["AWS", "Azure", "Google Cloud Platform", "VMware vSphere", "Kubernetes", "Docker"],
        ),
        (
            "DB",
            "Database",
            &[
                "SQL Server 2022",
                "Oracle Database 19c",
                "MySQL 8.0",
                "PostgreSQL 15",
                "MongoDB 6.0",
                "MariaDB 10.11",
            ],
        ),
        (
            "MW",
            "Middleware",
            &["Apache Tomcat", "JBoss EAP", "WebSphere", "WebLogic", "Nginx", "IIS"],
        ),
        (
            "NET",
            "Network",
            &[
                "Cisco IOS",
                "Juniper Junos",
                "Palo Alto PAN-OS",
                "F5 BIG-IP",
                "Fortinet FortiOS",
                "Checkpoint",
            ],
        ),
        (
            "APPS",
            "Applications",
            &["Microsoft 365", "Salesforce", "SAP", "Oracle EBS", "Workday", "ServiceNow"],
        ),
    ];

    /// `"MySQL 8.0"` -> `"mysql-8-0"`
    pub(super) fn slug(title: &str) -> String {
        let mut out = String::with_capacity(title.len());
        for ch in title.chars() {
            if ch.is_ascii_alphanumeric() {
                out.push(ch.to_ascii_lowercase());
            } else if !out.ends_with('-') {
                out.push('-');
            }
        }
        out.trim_matches('-').to_owned()
    }

    struct Sample {
        id: &'static str,
        tech: &'static str,
        family: &'static str,
        description: &'static str,
        statement: &'static str,
        monitor: &'static str,
        recommendation: &'static str,
        code: &'static str,
        comments: &'static str,
    }

    const SAMPLES: &[Sample] = &[
        Sample {
            id: "OS-WIN-001",
            tech: "Windows 11",
            family: "Access Control",
            description: "Ensure local administrator accounts are disabled or restricted",
            statement: "Local administrator accounts must be disabled or restricted to prevent unauthorized access.",
            monitor: "M-WIN-AC-001",
            recommendation: "Use Group Policy to disable local administrator accounts or restrict their use to emergency scenarios only.",
            code: "policy: local_admin\nstate: disabled\n",
            comments: "Critical for preventing privilege escalation attacks.",
        },
        Sample {
            id: "OS-WIN-002",
            tech: "Windows 11",
            family: "Authentication",
            description: "Implement multi-factor authentication for all administrative access",
            statement: "Multi-factor authentication must be implemented for all administrative access to Windows systems.",
            monitor: "M-WIN-AU-001",
            recommendation: "Configure Windows Hello for Business or integrate with a third-party MFA solution.",
            code: "policy: admin_mfa\nrequired: true\n",
            comments: "Reduces risk of credential theft and unauthorized access.",
        },
        Sample {
            id: "OS-WIN-003",
            tech: "Windows 11",
            family: "Audit and Accountability",
            description: "Enable comprehensive audit logging",
            statement: "Comprehensive audit logging must be enabled to track all security-relevant events.",
            monitor: "M-WIN-AA-001",
            recommendation: "Configure Windows Event Log settings to capture logon events, privilege use, policy changes, and system events.",
            code: "audit:\n  logon: success_failure\n  privilege_use: success_failure\n",
            comments: "Essential for incident response and forensic analysis.",
        },
        Sample {
            id: "OS-WIN-004",
            tech: "Windows 11",
            family: "Configuration Management",
            description: "Disable unnecessary services and features",
            statement: "All unnecessary services and features must be disabled to reduce attack surface.",
            monitor: "M-WIN-CM-001",
            recommendation: "Use Group Policy to disable unnecessary Windows services and features not required for business operations.",
            code: "services:\n  disable: [RemoteRegistry, XblGameSave]\n",
            comments: "Reduces attack surface and potential vulnerabilities.",
        },
        Sample {
            id: "OS-WIN-005",
            tech: "Windows 11",
            family: "Endpoint Protection",
            description: "Deploy and configure Windows Defender",
            statement: "Windows Defender must be deployed and properly configured on all Windows systems.",
            monitor: "M-WIN-EP-001",
            recommendation: "Enable real-time protection, cloud-delivered protection, and automatic sample submission.",
            code: "defender:\n  realtime: true\n  cloud: true\n",
            comments: "Provides baseline protection against malware and other threats.",
        },
        Sample {
            id: "DB-MYSQL-001",
            tech: "MySQL 8.0",
            family: "Data Protection",
            description: "Encrypt tablespaces at rest",
            statement: "Transparent Data Encryption (TDE) must be enabled for all InnoDB tablespaces.",
            monitor: "M-MYSQL-DP-001",
            recommendation: "Install a keyring component and set default_table_encryption=ON.",
            code: "mysqld:\n  default_table_encryption: 'ON'\n",
            comments: "",
        },
        Sample {
            id: "DB-MYSQL-002",
            tech: "MySQL 8.0",
            family: "Authentication",
            description: "Remove anonymous accounts",
            statement: "Anonymous user accounts must not exist.",
            monitor: "M-MYSQL-AU-001",
            recommendation: "DROP USER ''@'localhost' and ''@'%'.",
            code: "users:\n  anonymous: absent\n",
            comments: "",
        },
        Sample {
            id: "DB-SQL-001",
            tech: "SQL Server 2022",
            family: "Data Protection",
            description: "Enable TDE on user databases",
            statement: "Transparent Data Encryption must protect every user database.",
            monitor: "M-MSSQL-DP-001",
            recommendation: "Create a database encryption key and SET ENCRYPTION ON.",
            code: "database:\n  encryption: 'ON'\n",
            comments: "",
        },
    ];

    pub(super) fn seed() -> (Vec<TechnologyFamily>, Vec<Technology>, Vec<Control>) {
        let mut families = Vec::new();
        let mut technologies = Vec::new();
        for (family_id, family_title, techs) in CATALOG {
            families.push(TechnologyFamily {
                id: FamilyId::from(*family_id),
                title: (*family_title).to_owned(),
            });
            for title in *techs {
                technologies.push(Technology {
                    id: TechnologyId::from(slug(title)),
                    title: (*title).to_owned(),
                    family_id: FamilyId::from(*family_id),
                });
            }
        }

        let now = Utc::now();
        let mut controls = Vec::new();
        let mut rank_by_tech: BTreeMap<&str, i32> = BTreeMap::new();
        for sample in SAMPLES {
            let rank = rank_by_tech.entry(sample.tech).or_insert(0);
            *rank += 1;
            controls.push(Control {
                id: ControlId::from(sample.id),
                tech_id: TechnologyId::from(slug(sample.tech)),
                family_id: None,
                technology_title: None,
                family_title: None,
                control_family: sample.family.to_owned(),
                control_type: "Technical".to_owned(),
                ranking: Some(*rank),
                monitor_id: Some(sample.monitor.to_owned()),
                description: sample.description.to_owned(),
                statement: sample.statement.to_owned(),
                recommendation: sample.recommendation.to_owned(),
                thr_code: sample.code.to_owned(),
                comments: (!sample.comments.is_empty()).then(|| sample.comments.to_owned()),
                created_at: Some(now),
                updated_at: Some(now),
            });
        }

        (families, technologies, controls)
    }
}
