use anyhow::Result;

use crate::Context;
use crate::cli::ValidateArgs;
use crate::ui;

pub fn run(ctx: &Context, args: ValidateArgs) -> Result<()> {
    let service = super::service(args.kind.kind);
    let document = super::load_document(&args.file)?;

    service.validate_all(&document)?;

    if !ctx.quiet {
        let declared: Vec<_> = service
            .attributes()
            .map(|a| a.key())
            .filter(|key| document.contains_key(*key))
            .collect();
        ui::success(&format!(
            "{} is a valid {} service declaration",
            args.file.display(),
            service.metadata().kind
        ));
        if !declared.is_empty() {
            ui::dim(&format!("attributes: {}", declared.join(", ")));
        }
    }

    Ok(())
}
