//! `hvfiles render` - print a rendered script without running it

use anyhow::{Result, bail};
use psscript::{Registry, TemplateArgs, TemplateId};

use crate::cli::RenderArgs;

pub fn run(args: &RenderArgs) -> Result<()> {
    print!("{}", render_script(&args.template, &args.path, args.source.as_deref())?);
    Ok(())
}

/// Render a template by name with the given arguments.
pub fn render_script(template: &str, path: &str, source: Option<&str>) -> Result<String> {
    let id: TemplateId = template.parse()?;

    let args = match (id, source) {
        (TemplateId::CreateOrUpdateFile, Some(source)) => {
            TemplateArgs::create_or_update(path, source)
        }
        (TemplateId::CreateOrUpdateFile, None) => bail!("{id} requires --source"),
        (TemplateId::GetFile, None) => TemplateArgs::get(path),
        (TemplateId::DeleteFile, None) => TemplateArgs::delete(path),
        (_, Some(_)) => bail!("{id} takes no --source"),
    };

    Ok(Registry::new()?.render(&args)?.into_body())
}
