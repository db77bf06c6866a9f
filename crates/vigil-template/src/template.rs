use crate::delay::DelaySpec;
use crate::duration::parse_duration;
use crate::error::{Result, TemplateError};
use crate::expr::Expr;
use crate::lookup::LookupSpec;
use crate::selector::Selector;
use crate::stanza::Stanza;
use vigil_common::pattern::SimplePattern;

/// One compiled alert template. Immutable after load; the Instance Matcher
/// binds it to every entity its selector accepts.
#[derive(Debug, Clone)]
pub struct TemplateDef {
    /// Globally unique name; other templates reference this instance's
    /// value as `$<name>`.
    pub name: String,
    pub selector: Selector,
    /// Classification tags; matching never depends on them.
    pub class: Option<String>,
    pub component: Option<String>,
    pub kind: Option<String>,
    pub lookup: Option<LookupSpec>,
    pub calc: Option<Expr>,
    pub warn: Option<Expr>,
    pub crit: Option<Expr>,
    pub units: String,
    /// Evaluation period in seconds; the entity's own collection interval
    /// applies when absent.
    pub every_secs: Option<u64>,
    pub delay: DelaySpec,
    pub info: String,
    /// Recipient role for notifications.
    pub to: String,
}

impl TemplateDef {
    /// Compile one stanza. Errors are scoped to this stanza; the caller
    /// decides whether to skip or abort.
    pub fn compile(stanza: &Stanza) -> Result<Self> {
        let name = stanza
            .name()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| TemplateError::MissingField {
                template: format!("<line {}>", stanza.line),
                field: "template",
            })?
            .to_string();

        let on = stanza
            .get("on")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| TemplateError::MissingField {
                template: name.clone(),
                field: "on",
            })?;

        let selector = Selector {
            on: SimplePattern::parse(on),
            os: pattern_field(stanza, "os"),
            hosts: pattern_field(stanza, "hosts"),
            families: pattern_field(stanza, "families"),
        };

        let lookup = stanza
            .get("lookup")
            .map(|v| v.parse::<LookupSpec>())
            .transpose()?;

        let calc = formula_field(stanza, &name, "calc")?;
        let warn = formula_field(stanza, &name, "warn")?;
        let crit = formula_field(stanza, &name, "crit")?;

        if lookup.is_none() && calc.is_none() {
            return Err(TemplateError::NoValueSource(name));
        }

        let every_secs = stanza.get("every").map(parse_duration).transpose()?;

        let delay = match stanza.get("delay") {
            Some(v) => v.parse::<DelaySpec>()?,
            None => DelaySpec::default(),
        };

        Ok(Self {
            name,
            selector,
            class: owned_field(stanza, "class"),
            component: owned_field(stanza, "component"),
            kind: owned_field(stanza, "type"),
            lookup,
            calc,
            warn,
            crit,
            units: stanza.get("units").unwrap_or_default().to_string(),
            every_secs,
            delay,
            info: stanza.get("info").unwrap_or_default().to_string(),
            to: stanza.get("to").unwrap_or("sysadmin").to_string(),
        })
    }
}

fn pattern_field(stanza: &Stanza, key: &str) -> SimplePattern {
    match stanza.get(key) {
        Some(value) => SimplePattern::parse(value),
        None => SimplePattern::match_all(),
    }
}

fn owned_field(stanza: &Stanza, key: &str) -> Option<String> {
    stanza.get(key).filter(|v| !v.is_empty()).map(String::from)
}

fn formula_field(stanza: &Stanza, name: &str, field: &'static str) -> Result<Option<Expr>> {
    match stanza.get(field) {
        Some(text) if !text.is_empty() => {
            let expr = Expr::parse(text).map_err(|source| TemplateError::Formula {
                template: name.to_string(),
                field,
                source,
            })?;
            Ok(Some(expr))
        }
        _ => Ok(None),
    }
}
