//! File-level helpers tying the registry, handlers and composers together.
//!
//! File handles live only for the duration of each call.

use crate::compose::{select_composer, ComposeConfig, ComposerHint, Generator};
use crate::registry::FormatRegistry;
use hdrconv_core::{ImageContainer, IntermediateRendering, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Read a container from `path`.
///
/// With `format` the named handler is used directly; otherwise the
/// registry sniffs the content.
pub fn read_container(
    path: impl AsRef<Path>,
    registry: &FormatRegistry,
    format: Option<&str>,
) -> Result<ImageContainer> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    let handler = match format {
        Some(name) => registry.get(name)?,
        None => registry.identify(&mut reader)?,
    };
    log::debug!("reading {} as {}", path.as_ref().display(), handler.name());
    handler.read(&mut reader)
}

/// Write `container` to `path` with the handler registered as `format`.
pub fn write_container(
    path: impl AsRef<Path>,
    registry: &FormatRegistry,
    format: &str,
    container: &ImageContainer,
) -> Result<()> {
    let handler = registry.get(format)?;
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    handler.write(&mut writer, container)?;
    writer.flush()?;
    Ok(())
}

/// Compose a container into the canonical linear rendering.
pub fn to_intermediate(
    container: &ImageContainer,
    hint: Option<ComposerHint>,
    config: &ComposeConfig,
) -> Result<IntermediateRendering> {
    select_composer(container, hint)
        .composer(config)
        .compose(container)
}

/// Build an output container from a rendering.
pub fn from_intermediate(
    rendering: &IntermediateRendering,
    generator: &dyn Generator,
) -> Result<ImageContainer> {
    generator.generate(rendering)
}
