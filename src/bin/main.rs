//! S3O Codec CLI
//!
//! Inspect and optimize Spring S3O unit models.

use clap::{Parser, Subcommand};
use s3o_codec::{
    AuthoredFace, DecodeOptions, EncodeOptions, Model, Piece, S3oReader, S3oWriter, WeldConfig,
};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write as _};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "s3o-codec")]
#[command(author, version, about = "Inspect and optimize Spring S3O unit models", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a model file
    Info {
        /// Path to the .s3o file
        file: PathBuf,

        /// Emit the summary as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Rewrite a model with duplicate vertices welded away
    Optimize {
        /// Input .s3o file
        input: PathBuf,

        /// Output .s3o file
        #[arg(short, long)]
        output: PathBuf,

        /// Weld tolerance for position and normal comparison
        #[arg(long, default_value = "0.000001")]
        tolerance: f32,

        /// Strip trailing ".NNN" copy suffixes from piece names
        #[arg(long)]
        strip_suffix: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { file, json } => {
            show_info(&file, json)?;
        }
        Commands::Optimize {
            input,
            output,
            tolerance,
            strip_suffix,
        } => {
            optimize(&input, &output, tolerance, strip_suffix)?;
        }
    }

    Ok(())
}

fn show_info(path: &PathBuf, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let file = BufReader::new(File::open(path)?);
    let model = S3oReader::new(file)?.read_model()?;

    if json {
        let summary = ModelSummary::from_model(&model);
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Model: {:?}", path);
    println!("  Radius: {}", model.radius);
    println!("  Height: {}", model.height);
    println!("  Center: {}", model.center);
    println!(
        "  Texture 1: {}",
        model.texture1.as_deref().unwrap_or("(none)")
    );
    println!(
        "  Texture 2: {}",
        model.texture2.as_deref().unwrap_or("(none)")
    );
    println!(
        "  Pieces: {} ({} vertices total)",
        model.root.piece_count(),
        model.root.total_vertices()
    );
    println!("\nPiece tree:");
    print_piece(&model.root, 1);

    Ok(())
}

fn print_piece(piece: &Piece, depth: usize) {
    println!(
        "{}{} ({} verts, {} faces)",
        "  ".repeat(depth),
        piece.name,
        piece.vertices.len(),
        piece.faces.len()
    );
    for child in &piece.children {
        print_piece(child, depth + 1);
    }
}

fn optimize(
    input: &PathBuf,
    output: &PathBuf,
    tolerance: f32,
    strip_suffix: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading model from {:?}...", input);
    let config = WeldConfig { tolerance };
    let file = BufReader::new(File::open(input)?);
    let mut model = S3oReader::with_options(
        file,
        DecodeOptions {
            weld: Some(config),
        },
    )?
    .read_model()?;

    let before = model.root.total_vertices();
    rebuild_piece(&mut model.root, &config)?;
    let after = model.root.total_vertices();
    println!(
        "  Welded {} vertices down to {} ({} removed)",
        before,
        after,
        before - after
    );

    let out = BufWriter::new(File::create(output)?);
    let mut writer = S3oWriter::with_options(
        out,
        EncodeOptions {
            strip_name_suffix: strip_suffix,
        },
    );
    writer.write_model(&model)?;
    writer.into_inner().flush()?;
    println!("Wrote optimized model to {:?}", output);

    Ok(())
}

/// Replace a piece's stored geometry with its welded form, re-splitting only
/// where faces genuinely disagree on UV. Going through the authored corner
/// UVs keeps texture seams intact while merged interior vertices stay merged.
fn rebuild_piece(piece: &mut Piece, config: &WeldConfig) -> s3o_codec::Result<()> {
    if let Some(welded) = piece.welded.take() {
        let authored: Vec<AuthoredFace> = piece
            .faces
            .iter()
            .zip(&welded.faces)
            .map(|(original, remapped)| {
                let uvs = original
                    .indices()
                    .iter()
                    .map(|&i| piece.vertices[i as usize].uv)
                    .collect();
                AuthoredFace::new(remapped.indices().to_vec(), uvs)
            })
            .collect();

        let (vertices, faces) =
            s3o_codec::split_corner_uvs(&welded.vertices, &authored, config)?;
        piece.vertices = vertices;
        piece.faces = faces;
    }
    for child in &mut piece.children {
        rebuild_piece(child, config)?;
    }
    Ok(())
}

// JSON summary format
#[derive(serde::Serialize)]
struct ModelSummary {
    radius: f32,
    height: f32,
    center: [f32; 3],
    texture1: Option<String>,
    texture2: Option<String>,
    piece_count: usize,
    total_vertices: usize,
    root: PieceSummary,
}

#[derive(serde::Serialize)]
struct PieceSummary {
    name: String,
    vertices: usize,
    faces: usize,
    offset: [f32; 3],
    children: Vec<PieceSummary>,
}

impl ModelSummary {
    fn from_model(model: &Model) -> Self {
        Self {
            radius: model.radius,
            height: model.height,
            center: model.center.to_array(),
            texture1: model.texture1.clone(),
            texture2: model.texture2.clone(),
            piece_count: model.root.piece_count(),
            total_vertices: model.root.total_vertices(),
            root: PieceSummary::from_piece(&model.root),
        }
    }
}

impl PieceSummary {
    fn from_piece(piece: &Piece) -> Self {
        Self {
            name: piece.name.clone(),
            vertices: piece.vertices.len(),
            faces: piece.faces.len(),
            offset: piece.offset.to_array(),
            children: piece.children.iter().map(Self::from_piece).collect(),
        }
    }
}
