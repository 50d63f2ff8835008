//! Named read-only checks over the training database.
//!
//! Every check is independent: it only reads, and a table that does not exist
//! is reported as unavailable instead of aborting the run.

use clap::ValueEnum;
use tracing::{info, warn};

use crate::config::InspectorConfig;
use crate::error::{InspectError, Result};
use crate::report::{CheckReport, Section};
use crate::sqlite::{Inspector, ReadOperation, Relation, Row};

/// Tables of the inspected schema.
pub mod tables {
    pub const USERS: &str = "AspNetUsers";
    pub const SITE_USERS: &str = "Utilisateurs";
    pub const FORMATIONS: &str = "Formations";
    pub const SESSIONS: &str = "Sessions";
    pub const CLIENTS: &str = "Clients";
    pub const TRAINEES: &str = "Stagiaires";
    pub const TRAINERS: &str = "Formateurs";
    pub const DOCUMENTS: &str = "Documents";
    pub const INDICATORS: &str = "IndicateursQualiopi";
    pub const EVIDENCE: &str = "PreuvesQualiopi";
    pub const SITES: &str = "Sites";
}

const SITE_KEY: &str = "SiteId";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, ValueEnum)]
pub enum Check {
    /// Row counts of the main tables
    Counts,
    /// Every user with role and site
    Users,
    /// Sample of training offerings
    Formations,
    /// Sites with their activity flag
    Sites,
    /// Column layout and raw rows of the sites table
    SitesSchema,
    /// Dashboard counts grouped by site
    BySite,
    /// Per-site counts for each configured site
    SiteData,
    /// Users of each configured site
    SiteUsers,
    /// Qualiopi indicators per site
    Qualiopi,
    /// Sessions without any document
    Orphans,
    /// Tables introduced by recent migrations
    Migration,
}

impl Check {
    pub fn name(self) -> &'static str {
        match self {
            Check::Counts => "counts",
            Check::Users => "users",
            Check::Formations => "formations",
            Check::Sites => "sites",
            Check::SitesSchema => "sites-schema",
            Check::BySite => "by-site",
            Check::SiteData => "site-data",
            Check::SiteUsers => "site-users",
            Check::Qualiopi => "qualiopi",
            Check::Orphans => "orphans",
            Check::Migration => "migration",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Check::Counts => "État actuel de la base de données",
            Check::Users => "Utilisateurs",
            Check::Formations => "Formations",
            Check::Sites => "Vérification des sites",
            Check::SitesSchema => "Structure de la table Sites",
            Check::BySite => "Vérification des données pour le dashboard",
            Check::SiteData => "Vérification des données par site",
            Check::SiteUsers => "Vérification des utilisateurs par site",
            Check::Qualiopi => "Vérification des indicateurs Qualiopi par site",
            Check::Orphans => "Sessions sans documents",
            Check::Migration => "Vérification des données existantes",
        }
    }

    pub fn all() -> &'static [Check] {
        Check::value_variants()
    }
}

/// Run one check against the database.
pub fn run(check: Check, inspector: &Inspector, config: &InspectorConfig) -> Result<CheckReport> {
    info!(check = check.name(), "running check");
    let mut report = CheckReport::new(check.name(), check.title());
    match check {
        Check::Counts => counts(inspector, &mut report)?,
        Check::Users => users(inspector, &mut report)?,
        Check::Formations => formations(inspector, config, &mut report)?,
        Check::Sites => sites(inspector, &mut report)?,
        Check::SitesSchema => sites_schema(inspector, &mut report)?,
        Check::BySite => by_site(inspector, &mut report)?,
        Check::SiteData => site_data(inspector, config, &mut report)?,
        Check::SiteUsers => site_users(inspector, config, &mut report)?,
        Check::Qualiopi => qualiopi(inspector, config, &mut report)?,
        Check::Orphans => orphans(inspector, config, &mut report)?,
        Check::Migration => migration(inspector, &mut report)?,
    }
    Ok(report)
}

/// Run checks in the given order, stopping at the first hard failure.
pub fn run_all(
    checks: &[Check],
    inspector: &Inspector,
    config: &InspectorConfig,
) -> Result<Vec<CheckReport>> {
    checks
        .iter()
        .map(|check| run(*check, inspector, config))
        .collect()
}

/// Turn a missing table into an `Unavailable` entry, propagate anything else.
fn tolerate<T>(section: &mut Section, result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(InspectError::MissingTable(table)) => {
            warn!(%table, "table not found");
            section.unavailable(table);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn push_counts(
    inspector: &Inspector,
    section: &mut Section,
    labels: &[(&str, &str)],
) -> Result<()> {
    for (label, table) in labels {
        if let Some(count) = tolerate(section, inspector.count(table))? {
            section.count(*label, count);
        }
    }
    Ok(())
}

fn counts(inspector: &Inspector, report: &mut CheckReport) -> Result<()> {
    let mut section = Section::new();
    push_counts(
        inspector,
        &mut section,
        &[
            ("Utilisateurs", tables::USERS),
            ("Formations", tables::FORMATIONS),
            ("Sessions", tables::SESSIONS),
            ("Clients", tables::CLIENTS),
            ("Stagiaires", tables::TRAINEES),
            ("Indicateurs Qualiopi", tables::INDICATORS),
            ("Sites", tables::SITES),
            ("Formateurs", tables::TRAINERS),
        ],
    )?;
    report.push(section);
    Ok(())
}

fn users(inspector: &Inspector, report: &mut CheckReport) -> Result<()> {
    let mut section = Section::new();
    let op = ReadOperation::new(tables::USERS).with_fields(&["Email", "Role", SITE_KEY]);
    if let Some(rows) = tolerate(&mut section, inspector.read(&op))? {
        for row in rows {
            section.item(format!(
                "{} (Role: {}, Site: {})",
                row.get("Email"),
                row.get("Role"),
                row.get(SITE_KEY).display_or("N/A")
            ));
        }
    }
    report.push(section);
    Ok(())
}

fn formations(
    inspector: &Inspector,
    config: &InspectorConfig,
    report: &mut CheckReport,
) -> Result<()> {
    let mut section = Section::new();
    let op = ReadOperation::new(tables::FORMATIONS)
        .with_fields(&["Titre", SITE_KEY])
        .with_limit(config.sample_limit);
    if let Some(rows) = tolerate(&mut section, inspector.read(&op))? {
        for row in rows {
            section.item(format!(
                "{} (Site: {})",
                row.get("Titre"),
                row.get(SITE_KEY).display_or("N/A")
            ));
        }
    }
    report.push(section);
    Ok(())
}

fn sites(inspector: &Inspector, report: &mut CheckReport) -> Result<()> {
    let mut section = Section::new();
    // Older schemas call the flag `Actif`, newer ones `IsActive`.
    let mut flag = None;
    for candidate in ["Actif", "IsActive"] {
        if inspector.has_column(tables::SITES, candidate)? {
            flag = Some(candidate);
            break;
        }
    }
    let mut fields = vec![SITE_KEY, "Name"];
    fields.extend(flag);
    let op = ReadOperation::new(tables::SITES).with_fields(&fields);
    if let Some(rows) = tolerate(&mut section, inspector.read(&op))? {
        section.count("Nombre de sites", rows.len() as i64);
        for row in rows {
            let mut line = format!("{}: {}", row.get(SITE_KEY), row.get("Name"));
            if let Some(flag) = flag {
                line.push_str(&format!(" (Actif: {})", row.get(flag)));
            }
            section.item(line);
        }
    }
    report.push(section);
    Ok(())
}

fn describe_row(row: &Row) -> String {
    row.columns
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn sites_schema(inspector: &Inspector, report: &mut CheckReport) -> Result<()> {
    let mut columns = Section::titled("Colonnes");
    let info = inspector.table_info(tables::SITES)?;
    if info.is_empty() {
        columns.unavailable(tables::SITES);
        report.push(columns);
        return Ok(());
    }
    for column in &info {
        columns.item(format!("{} ({})", column.name, column.data_type));
    }
    report.push(columns);

    let mut data = Section::titled("Données des sites");
    if let Some(rows) = tolerate(&mut data, inspector.read(&ReadOperation::new(tables::SITES)))? {
        data.count("Nombre de sites", rows.len() as i64);
        for row in &rows {
            data.item(describe_row(row));
        }
    }
    report.push(data);
    Ok(())
}

fn by_site(inspector: &Inspector, report: &mut CheckReport) -> Result<()> {
    for (heading, table, unit) in [
        ("Formations par site", tables::FORMATIONS, "formations"),
        ("Sessions par site", tables::SESSIONS, "sessions"),
        ("Documents par site", tables::DOCUMENTS, "documents"),
        ("Indicateurs Qualiopi par site", tables::INDICATORS, "indicateurs"),
    ] {
        let mut section = Section::titled(heading);
        if let Some(groups) = tolerate(&mut section, inspector.count_by(table, SITE_KEY))? {
            for (site, count) in groups {
                section.count_of(format!("Site {}", site.display_or("N/A")), count, unit);
            }
        }
        report.push(section);
    }
    Ok(())
}

fn site_data(
    inspector: &Inspector,
    config: &InspectorConfig,
    report: &mut CheckReport,
) -> Result<()> {
    let counted = [
        ("Formations", tables::FORMATIONS),
        ("Sessions", tables::SESSIONS),
        ("Clients", tables::CLIENTS),
        ("Stagiaires", tables::TRAINEES),
        ("Documents", tables::DOCUMENTS),
        ("Preuves", tables::EVIDENCE),
        ("Utilisateurs", tables::SITE_USERS),
    ];
    for site in &config.sites {
        let mut section = Section::titled(site.as_str());
        for (label, table) in counted {
            let count = inspector.count_where(table, SITE_KEY, site.as_str());
            if let Some(count) = tolerate(&mut section, count)? {
                section.count(label, count);
            }
        }
        report.push(section);
    }
    Ok(())
}

fn site_users(
    inspector: &Inspector,
    config: &InspectorConfig,
    report: &mut CheckReport,
) -> Result<()> {
    for site in &config.sites {
        let mut section = Section::titled(site.as_str());
        let op = ReadOperation::new(tables::USERS)
            .with_fields(&["Email", "Role"])
            .with_filter(SITE_KEY, site.as_str());
        let Some(rows) = tolerate(&mut section, inspector.read(&op))? else {
            // Same table for every site, report it once.
            report.push(section);
            return Ok(());
        };
        if rows.is_empty() {
            continue;
        }
        for row in rows {
            section.item(format!("{} (Role: {})", row.get("Email"), row.get("Role")));
        }
        report.push(section);
    }
    Ok(())
}

fn qualiopi(
    inspector: &Inspector,
    config: &InspectorConfig,
    report: &mut CheckReport,
) -> Result<()> {
    let mut per_site = Section::new();
    for site in &config.sites {
        let count = inspector.count_where(tables::INDICATORS, SITE_KEY, site.as_str());
        match tolerate(&mut per_site, count)? {
            Some(count) if count > 0 => {
                per_site.count_of(site.as_str(), count, "indicateurs Qualiopi");
            }
            Some(_) => {}
            None => {
                report.push(per_site);
                return Ok(());
            }
        }
    }
    report.push(per_site);

    let mut totals = Section::titled("Total indicateurs par site");
    if let Some(groups) = tolerate(&mut totals, inspector.count_by(tables::INDICATORS, SITE_KEY))? {
        for (site, count) in groups {
            totals.count_of(site.display_or("N/A"), count, "indicateurs");
        }
    }
    report.push(totals);
    Ok(())
}

fn orphans(
    inspector: &Inspector,
    config: &InspectorConfig,
    report: &mut CheckReport,
) -> Result<()> {
    let mut section = Section::new();
    let relation = Relation::new(tables::SESSIONS, "Id", tables::DOCUMENTS, "SessionId");
    let missing = inspector.missing_related(&relation, &["Id", SITE_KEY]);
    if let Some(rows) = tolerate(&mut section, missing)? {
        section.count_of("Total", rows.len() as i64, "sessions sans documents");
        for row in rows.iter().take(config.sample_limit) {
            section.item(format!(
                "Session {} (Site: {})",
                row.get("Id"),
                row.get(SITE_KEY).display_or("N/A")
            ));
        }
    }
    report.push(section);
    Ok(())
}

fn migration(inspector: &Inspector, report: &mut CheckReport) -> Result<()> {
    let mut section = Section::new();
    push_counts(
        inspector,
        &mut section,
        &[("Sessions", tables::SESSIONS), ("Formateurs", tables::TRAINERS)],
    )?;
    report.push(section);
    Ok(())
}
