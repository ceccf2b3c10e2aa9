//! Configuration-driven rule store
//!
//! Rules are compiled once from `[[rules]]` and `[[admin_rules]]`, sorted by
//! ascending priority (ties keep file order) and evaluated first match wins.
//! A request no rule matches receives a DENY record.

use crate::access::{GrantProvider, GrantRecord, GrantRequest, GrantType, Principal};
use crate::catalog::{ANY, AccessSummary, AdminGrant, NO_WORKSPACE, WorkspaceAccessSummary};
use crate::config::{AdminRuleConfig, AppConfig, RuleConfig};
use crate::error::ConfigError;
use crate::filter;
use crate::geometry::Geometry;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// Matchers of a compiled rule. `None` matches anything.
#[derive(Debug, Clone)]
struct Matcher {
    user: Option<String>,
    role: Option<String>,
    service: Option<String>,
    request: Option<String>,
    workspace: Option<String>,
    layer: Option<String>,
}

impl Matcher {
    fn matches(&self, req: &GrantRequest) -> bool {
        self.matches_identity(req.user.as_deref(), &req.roles)
            && matches_ci(&self.service, req.service.as_deref())
            && matches_ci(&self.request, req.request.as_deref())
            && self.matches_workspace(req.workspace.as_deref())
            && self.layer.as_deref().is_none_or(|l| l == req.layer)
    }

    fn matches_identity(&self, user: Option<&str>, roles: &BTreeSet<String>) -> bool {
        let user_ok = match &self.user {
            Some(u) => user == Some(u.as_str()),
            None => true,
        };
        let role_ok = match &self.role {
            Some(r) => roles.contains(r),
            None => true,
        };
        user_ok && role_ok
    }

    /// `""` targets global groups, which are requested without a workspace
    fn matches_workspace(&self, workspace: Option<&str>) -> bool {
        match self.workspace.as_deref() {
            None => true,
            Some(NO_WORKSPACE) => workspace.is_none_or(str::is_empty),
            Some(ws) => workspace == Some(ws),
        }
    }

    fn is_service_bound(&self) -> bool {
        self.service.is_some() || self.request.is_some()
    }
}

fn matches_ci(expected: &Option<String>, actual: Option<&str>) -> bool {
    match expected {
        Some(e) => actual.is_some_and(|a| a.eq_ignore_ascii_case(e)),
        None => true,
    }
}

struct CompiledRule {
    matcher: Matcher,
    grant: GrantRecord,
}

struct CompiledAdminRule {
    user: Option<String>,
    role: Option<String>,
    workspace: Option<String>,
    admin: bool,
}

/// In-process [`GrantProvider`] backed by static rules
pub struct RuleStore {
    rules: Vec<CompiledRule>,
    admin_rules: Vec<CompiledAdminRule>,
}

impl RuleStore {
    /// Compile the rules of `config`
    pub fn new(config: &AppConfig) -> Result<Self, ConfigError> {
        let srid = config.access.default_srid;

        let mut indexed: Vec<(usize, &RuleConfig)> = config.rules.iter().enumerate().collect();
        indexed.sort_by_key(|(_, r)| r.priority);

        let rules = indexed
            .into_iter()
            .map(|(i, rule)| Self::compile_rule(i, rule, srid))
            .collect::<Result<Vec<_>, _>>()?;

        let mut admin: Vec<&AdminRuleConfig> = config.admin_rules.iter().collect();
        admin.sort_by_key(|r| r.priority);
        let admin_rules = admin
            .into_iter()
            .map(|r| CompiledAdminRule {
                user: r.user.clone(),
                role: r.role.clone(),
                workspace: r.workspace.clone(),
                admin: r.admin,
            })
            .collect();

        debug!(rules = config.rules.len(), admin_rules = config.admin_rules.len(), "Rule store compiled");

        Ok(Self { rules, admin_rules })
    }

    fn compile_rule(index: usize, rule: &RuleConfig, srid: u32) -> Result<CompiledRule, ConfigError> {
        let name = format!("rules[{}]", index);
        let area = |text: &Option<String>| -> Result<Option<Geometry>, ConfigError> {
            text.as_deref()
                .map(|t| Geometry::parse(t, srid))
                .transpose()
                .map_err(|e| ConfigError::InvalidArea {
                    rule: name.clone(),
                    reason: e.to_string(),
                })
        };
        for cql in [&rule.cql_read, &rule.cql_write].into_iter().flatten() {
            filter::parse(cql).map_err(|e| ConfigError::InvalidFilter {
                rule: name.clone(),
                reason: e.to_string(),
            })?;
        }

        let grant = GrantRecord {
            grant: rule.grant,
            mode: rule.mode,
            allowed_area: area(&rule.allowed_area)?,
            clip_area: area(&rule.clip_area)?,
            cql_read: rule.cql_read.clone(),
            cql_write: rule.cql_write.clone(),
            attributes: rule.attributes.clone(),
            default_style: rule.default_style.clone(),
            allowed_styles: rule.allowed_styles.clone(),
        };

        Ok(CompiledRule {
            matcher: Matcher {
                user: rule.user.clone(),
                role: rule.role.clone(),
                service: rule.service.clone(),
                request: rule.request.clone(),
                workspace: rule.workspace.clone(),
                layer: rule.layer.clone(),
            },
            grant,
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First matching rule's grant, DENY when none matches
    pub fn lookup(&self, request: &GrantRequest) -> GrantRecord {
        match self.rules.iter().position(|r| r.matcher.matches(request)) {
            Some(i) => {
                trace!(rule = i, grant = %self.rules[i].grant.grant, layer = %request.layer, "Rule matched");
                self.rules[i].grant.clone()
            }
            None => {
                trace!(layer = %request.layer, "No rule matched");
                GrantRecord::deny_all()
            }
        }
    }

    /// Condense the rules applying to `principal` into a visibility summary.
    ///
    /// Per workspace the first decision on a layer name wins, a decision on
    /// `*` closes the workspace and a decision on `*` in every workspace
    /// ends processing. Service-bound DENY rules are skipped since they do
    /// not hide anything outside their service.
    pub fn summarize(&self, principal: &Principal) -> AccessSummary {
        let user = principal.authenticated.then_some(principal.name.as_str());
        let mut conflated: BTreeMap<String, Conflation> = BTreeMap::new();

        for rule in &self.rules {
            let m = &rule.matcher;
            if !m.matches_identity(user, &principal.roles) {
                continue;
            }
            if m.is_service_bound() && rule.grant.is_denied() {
                continue;
            }

            let ws = m.workspace.clone().unwrap_or_else(|| ANY.to_string());
            let layer = m.layer.clone().unwrap_or_else(|| ANY.to_string());
            let finished = ws == ANY && layer == ANY;

            let entry = conflated.entry(ws).or_default();
            entry.decide(layer, rule.grant.grant);

            if finished {
                break;
            }
        }

        let mut entries: BTreeMap<String, WorkspaceAccessSummary> = conflated
            .into_iter()
            .map(|(ws, c)| {
                let summary = WorkspaceAccessSummary::new(ws.clone())
                    .allow(c.allowed)
                    .forbid(c.forbidden);
                (ws, summary)
            })
            .collect();

        let mut admin_decided: BTreeSet<String> = BTreeSet::new();
        for rule in &self.admin_rules {
            let user_ok = rule.user.as_deref().is_none_or(|u| user == Some(u));
            let role_ok = rule.role.as_ref().is_none_or(|r| principal.roles.contains(r));
            if !user_ok || !role_ok {
                continue;
            }
            let ws = rule.workspace.clone().unwrap_or_else(|| ANY.to_string());
            if !admin_decided.insert(ws.clone()) {
                continue;
            }
            if rule.admin {
                let entry = entries
                    .entry(ws.clone())
                    .or_insert_with(|| WorkspaceAccessSummary::new(ws));
                entry.admin = Some(AdminGrant::Admin);
            } else if let Some(entry) = entries.get_mut(&ws) {
                entry.admin = Some(AdminGrant::User);
            }
        }

        AccessSummary::of(entries.into_values())
    }
}

/// Per-workspace accumulation of layer decisions
#[derive(Default)]
struct Conflation {
    closed: bool,
    decided: BTreeSet<String>,
    allowed: BTreeSet<String>,
    forbidden: BTreeSet<String>,
}

impl Conflation {
    fn decide(&mut self, layer: String, grant: GrantType) {
        if self.closed || !self.decided.insert(layer.clone()) {
            return;
        }
        if layer == ANY {
            self.closed = true;
        }
        if grant.is_allowed() {
            self.allowed.insert(layer);
        } else {
            self.forbidden.insert(layer);
        }
    }
}

#[async_trait]
impl GrantProvider for RuleStore {
    async fn grant(&self, request: &GrantRequest) -> Option<GrantRecord> {
        Some(self.lookup(request))
    }

    async fn access_summary(&self, principal: &Principal) -> Option<AccessSummary> {
        Some(self.summarize(principal))
    }
}
