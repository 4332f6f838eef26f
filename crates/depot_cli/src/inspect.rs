//! `depot show` and `depot deps`: read-only views of the store.

use depot_cache::ClassInfoId;
use depot_classfile::MemberInfo;
use depot_common::{AccessFlags, Symbol};
use serde::Serialize;

use crate::session::{store_error, Session, Settings};
use crate::{ClassArgs, ReportFormat};

#[derive(Debug, Serialize)]
struct ClassReport {
    name: String,
    flags: String,
    superclass: Option<String>,
    interfaces: Vec<String>,
    source_file: Option<String>,
    path: Option<String>,
    fields: Vec<MemberReport>,
    methods: Vec<MemberReport>,
    subclasses: Vec<String>,
    referenced_classes: Vec<String>,
}

#[derive(Debug, Serialize)]
struct MemberReport {
    name: String,
    descriptor: String,
    flags: String,
    referencers: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DependencyReport {
    class: String,
    members: Vec<String>,
}

/// Runs `depot show <class>`.
pub fn show(args: &ClassArgs, settings: &Settings) -> Result<i32, Box<dyn std::error::Error>> {
    let session = Session::open(&settings.store_dir)?;
    let q = session.lookup_class(&args.class)?;
    let id = session
        .cache
        .class_id(q)
        .ok_or_else(|| format!("class '{}' is not in the store", args.class))?;
    let report = class_report(&session, id).map_err(store_error)?;

    match args.format {
        ReportFormat::Text => print_class(&report),
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string());
            println!("{json}");
        }
    }
    Ok(0)
}

/// Runs `depot deps <class>`.
pub fn deps(args: &ClassArgs, settings: &Settings) -> Result<i32, Box<dyn std::error::Error>> {
    let session = Session::open(&settings.store_dir)?;
    let q = session.lookup_class(&args.class)?;
    let dependencies = session.cache.back_dependencies(q).map_err(store_error)?;

    let reports: Vec<DependencyReport> = dependencies
        .iter()
        .map(|dep| DependencyReport {
            class: session.name(dep.class_qualified_name()).to_string(),
            members: dep
                .members()
                .iter()
                .map(|member| describe_member(&session, member))
                .collect(),
        })
        .collect();

    match args.format {
        ReportFormat::Text => {
            for report in &reports {
                println!("{}", report.class);
                for member in &report.members {
                    println!("    {member}");
                }
            }
        }
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&reports).unwrap_or_else(|_| "[]".to_string());
            println!("{json}");
        }
    }
    Ok(0)
}

fn class_report(session: &Session, id: ClassInfoId) -> Result<ClassReport, depot_cache::CacheError> {
    let cache = &session.cache;
    let name = |s: Symbol| session.name(s).to_string();
    let q = cache.qualified_name(id)?;

    let mut fields = Vec::new();
    let mut methods = Vec::new();
    if let Some(decl) = cache.find_declaration_id(q) {
        for field in cache.field_ids(decl)? {
            fields.push(MemberReport {
                name: name(cache.field_name(field)?),
                descriptor: name(cache.field_descriptor(field)?),
                flags: flag_words(cache.field_flags(field)?),
                referencers: cache.field_referencers(field)?.into_iter().map(name).collect(),
            });
        }
        for method in cache.method_ids(decl)? {
            methods.push(MemberReport {
                name: name(cache.method_name(method)?),
                descriptor: name(cache.method_descriptor(method)?),
                flags: flag_words(cache.method_flags(method)?),
                referencers: cache.method_referencers(method)?.into_iter().map(name).collect(),
            });
        }
    }

    Ok(ClassReport {
        name: name(q),
        flags: flag_words(cache.flags(id)?),
        superclass: cache.super_qualified_name(id)?.map(name),
        interfaces: cache.super_interfaces(id)?.into_iter().map(name).collect(),
        source_file: cache.source_file_name(id)?,
        path: cache.path(id)?,
        fields,
        methods,
        subclasses: cache.subclasses(id)?.into_iter().map(name).collect(),
        referenced_classes: cache.referenced_classes(id)?.into_iter().map(name).collect(),
    })
}

fn print_class(report: &ClassReport) {
    println!("{} {}", report.flags, report.name);
    if let Some(ref superclass) = report.superclass {
        println!("  extends {superclass}");
    }
    if !report.interfaces.is_empty() {
        println!("  implements {}", report.interfaces.join(", "));
    }
    if let Some(ref source) = report.source_file {
        println!("  source {source}");
    }
    if let Some(ref path) = report.path {
        println!("  path {path}");
    }
    for (heading, members) in [("fields", &report.fields), ("methods", &report.methods)] {
        if members.is_empty() {
            continue;
        }
        println!("  {heading}:");
        for member in members {
            println!(
                "    {} {} {} ({} referencer(s))",
                member.flags,
                member.name,
                member.descriptor,
                member.referencers.len()
            );
        }
    }
    if !report.subclasses.is_empty() {
        println!("  subclasses: {}", report.subclasses.join(", "));
    }
}

fn describe_member(session: &Session, member: &MemberInfo) -> String {
    let kind = match member {
        MemberInfo::Field(_) => "field",
        MemberInfo::Method(_) => "method",
    };
    format!(
        "{kind} {}{}",
        session.name(member.name()),
        session.name(member.descriptor())
    )
}

/// Renders access flags the way they appear in source.
fn flag_words(flags: AccessFlags) -> String {
    let mut words = Vec::new();
    if flags.is_public() {
        words.push("public");
    } else if flags.is_protected() {
        words.push("protected");
    } else if flags.is_private() {
        words.push("private");
    }
    if flags.is_static() {
        words.push("static");
    }
    if flags.is_abstract() && !flags.is_interface() {
        words.push("abstract");
    }
    if flags.is_final() {
        words.push("final");
    }
    if flags.is_annotation() {
        words.push("@interface");
    } else if flags.is_interface() {
        words.push("interface");
    }
    words.join(" ")
}
