//! RW4 CLI - Tool for inspecting and rewriting RenderWare 4 files.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rw4::material::MaterialStateCompiler;
use rw4::prelude::*;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("RW4_BUILD_DATE"), ")");

#[derive(Parser)]
#[command(name = "rw4", version = VERSION, about = "RenderWare 4 file toolkit")]
struct Cli {
    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show file kind, object counts and the type table.
    #[command(alias = "i")]
    Info {
        file: PathBuf,
        /// Print as JSON.
        #[arg(short, long)]
        json: bool,
    },
    /// List every section with its placement.
    #[command(alias = "s")]
    Sections { file: PathBuf },
    /// Decompile and print every compiled material state.
    States { file: PathBuf },
    /// Read a file and write it back (round trip).
    #[command(alias = "c")]
    Rewrite { input: PathBuf, output: PathBuf },
}

fn init_logging(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    // RUST_LOG wins unless a flag was given.
    let filter = if verbose > 0 || quiet {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Command::Info { file, json } => cmd_info(file, *json),
        Command::Sections { file } => cmd_sections(file),
        Command::States { file } => cmd_states(file),
        Command::Rewrite { input, output } => cmd_rewrite(input, output),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Serialize)]
struct InfoReport {
    file: String,
    kind: String,
    objects: usize,
    unknown_objects: usize,
    sub_references: usize,
    type_codes: Vec<String>,
    counts: Vec<(String, usize)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    texture: Option<Texture>,
}

fn info_report(path: &Path, renderware: &RenderWare) -> InfoReport {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for object in renderware.objects() {
        let name = object.type_name();
        match counts.iter_mut().find(|(n, _)| n == name) {
            Some((_, count)) => *count += 1,
            None => counts.push((name.to_string(), 1)),
        }
    }

    InfoReport {
        file: path.display().to_string(),
        kind: renderware.kind().to_string(),
        objects: renderware.objects().len(),
        unknown_objects: renderware.objects().iter().filter(|o| o.is_unknown()).count(),
        sub_references: renderware.sub_references().len(),
        type_codes: renderware
            .header()
            .section_manifest
            .types
            .type_codes
            .iter()
            .map(|code| format!("{code:#x}"))
            .collect(),
        counts,
        texture: renderware.is_texture().then(|| renderware.to_texture().ok()).flatten(),
    }
}

fn cmd_info(path: &Path, json: bool) -> Result<()> {
    let renderware = RenderWare::open(path)?;
    let report = info_report(path, &renderware);

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(e) => error!("JSON serialization failed: {e}"),
        }
        return Ok(());
    }

    println!("File:           {}", report.file);
    println!("Kind:           {}", report.kind);
    println!("Objects:        {} ({} unknown)", report.objects, report.unknown_objects);
    println!("Sub-references: {}", report.sub_references);
    println!("Type table:     {}", report.type_codes.join(" "));
    println!();
    for (name, count) in &report.counts {
        println!("  {name:<26} {count}");
    }
    if let Some(texture) = &report.texture {
        println!();
        println!(
            "Texture: {}x{} {} mips={}{} ({} bytes)",
            texture.width,
            texture.height,
            texture.format_name(),
            texture.mipmap_levels,
            if texture.cube_map { " cube" } else { "" },
            texture.data.len()
        );
    }
    Ok(())
}

fn cmd_sections(path: &Path) -> Result<()> {
    let renderware = RenderWare::open(path)?;
    println!("{:>5}  {:<26} {:>9} {:>10} {:>9} {:>5}", "index", "variant", "type", "offset", "size", "align");
    for (i, (object, section)) in renderware.objects().iter().zip(renderware.section_infos()).enumerate() {
        println!(
            "{:>5}  {:<26} {:>#9x} {:>#10x} {:>9} {:>5}",
            i,
            object.type_name(),
            section.type_code,
            section.offset,
            section.size,
            section.alignment
        );
    }
    Ok(())
}

fn cmd_states(path: &Path) -> Result<()> {
    let mut renderware = RenderWare::open(path)?;
    let count = renderware.decompile_states()?;
    info!("decompiled {count} compiled states");

    for (id, state) in renderware.objects_of::<CompiledState>() {
        if let Some(compiler) = &state.compiler {
            println!("{} ({} bytes)", renderware.name(id).unwrap_or_default(), state.data.len());
            print_state(&renderware, compiler);
            println!();
        }
    }
    Ok(())
}

fn object_name(renderware: &RenderWare, id: Option<ObjectId>) -> String {
    id.and_then(|id| renderware.name(id)).unwrap_or_else(|| "none".to_string())
}

fn print_state(renderware: &RenderWare, state: &MaterialStateCompiler) {
    println!(
        "  flags {:#010x} {:#010x} {:#010x}  field_14 {:#x}",
        state.flags1(),
        state.flags2(),
        state.flags3(),
        state.field_14
    );
    println!("  primitive_type {}  renderer_id {}", state.primitive_type, state.renderer_id);

    match &state.model_to_world {
        Some(ModelToWorld::Object(id)) => println!("  model_to_world -> {}", object_name(renderware, *id)),
        Some(ModelToWorld::Matrix(matrix)) => println!("  model_to_world {:?}", matrix.to_cols_array()),
        None => {}
    }
    if let Some(description) = &state.vertex_description {
        println!(
            "  vertex_description: {} elements, {} bytes per vertex",
            description.elements.len(),
            description.vertex_size
        );
    }
    for constant in &state.shader_data {
        println!("  shader_data[{}] offset {} {:x?}", constant.index, constant.offset, constant.data);
    }
    if let Some(color) = state.material_color {
        println!("  material_color {:?}", color.to_array());
    }
    if let Some(color) = state.ambient_color {
        println!("  ambient_color {:?}", color.to_array());
    }
    for (i, value) in state.optional_floats.iter().enumerate() {
        if let Some(value) = value {
            println!("  optional_float[{i}] {value}");
        }
    }
    if let Some(booleans) = &state.booleans {
        let bits: String = booleans.iter().map(|b| if *b { '1' } else { '0' }).collect();
        println!("  booleans {bits}");
    }
    for (group, states) in &state.render_states {
        println!("  render_states[{group}]");
        for (key, value) in states {
            println!("    {key} = {value:#x}");
        }
    }
    if let Some(palette) = state.palette_entries {
        println!("  palette -> {}", object_name(renderware, Some(palette)));
    }
    for slot in &state.texture_slots {
        println!(
            "  sampler {} -> {}",
            slot.sampler_index,
            object_name(renderware, slot.raster)
        );
        for (key, value) in &slot.stage_states {
            println!("    stage {key} = {value:#x}");
        }
        for (key, value) in &slot.sampler_states {
            println!("    sampler {key} = {value:#x}");
        }
    }
    if !state.trailing.is_empty() {
        println!("  trailing {} bytes", state.trailing.len());
    }
}

fn cmd_rewrite(input: &Path, output: &Path) -> Result<()> {
    let mut renderware = RenderWare::open(input)?;
    renderware.save(output)?;
    info!(
        "wrote {} objects to {}",
        renderware.objects().len(),
        output.display()
    );
    Ok(())
}
