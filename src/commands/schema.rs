use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use edgeconf::schema::{Collection, FieldDescriptor, Presence};

use crate::Context;
use crate::cli::SchemaArgs;
use crate::ui;

pub fn run(_ctx: &Context, args: SchemaArgs) -> Result<()> {
    let service = super::service(args.kind.kind);
    let schema = service.schema()?;

    if args.json {
        let json = serde_json::to_string_pretty(&schema).context("Failed to serialize schema")?;
        println!("{json}");
        return Ok(());
    }

    ui::header(&format!("{} service attributes", service.metadata().kind));
    for attribute in schema.attributes() {
        let shape = match attribute.collection {
            Collection::Set => "set".to_string(),
            Collection::List {
                min_items,
                max_items,
            } => format!("list of {min_items}..{max_items}"),
        };
        let required = if attribute.required { ", required" } else { "" };
        ui::section(&format!("{} ({shape}{required})", attribute.key));

        for field in &attribute.fields {
            print_field(field);
        }
    }

    Ok(())
}

fn print_field(field: &FieldDescriptor) {
    let presence = match field.presence {
        Presence::Required => "required".yellow(),
        Presence::Optional => "optional".normal(),
        Presence::Computed => "computed".dimmed(),
        Presence::OptionalComputed => "optional, computed".normal(),
    };

    let mut line = format!("  {} {:?} [{presence}]", field.name.bold(), field.field_type);
    if let Some(default) = &field.default {
        line.push_str(&format!(" default {default}"));
    }
    println!("{line}");

    if !field.description.is_empty() {
        ui::dim(&format!("  {}", field.description));
    }
}
