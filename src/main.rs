use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use gif2png::{Animation, DecodeOptions, ExportOptions, Progress};

/// Decode GIF animations and write their frames as PNG images.
#[derive(Parser, Debug)]
#[command(name = "gif2png", version)]
struct Cli {
    /// Composited frames kept in memory while decoding
    #[arg(long, global = true, default_value_t = 50)]
    cache_capacity: usize,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print frame count and logical screen size
    Info {
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a single composited frame as PNG
    Extract {
        input: PathBuf,
        index: usize,

        /// Output file, frame_<INDEX>.png by default
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write every frame as PNG
    Export {
        input: PathBuf,

        /// Directory for frame_<i>.png files
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Print JSON lines of progress and data URIs instead of writing files
        #[arg(long)]
        base64: bool,

        /// Frames per progress line
        #[arg(long, default_value_t = 10)]
        batch_size: usize,
    },
}

/// One line of `export --base64` output.
#[derive(Serialize)]
struct BatchLine {
    #[serde(flatten)]
    progress: Progress,
    frames: Vec<Option<String>>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let options = DecodeOptions {
        cache_capacity: cli.cache_capacity,
    };

    match cli.command {
        Command::Info { input, json } => {
            let animation = open(&input, options)?;
            let info = animation.info();
            if json {
                println!("{}", serde_json::to_string(&info)?);
            } else {
                println!("{}: {} frames, {}x{}", input.display(), info.frame_count, info.width, info.height);
            }
        },
        Command::Extract { input, index, output } => {
            let mut animation = open(&input, options)?;
            let frame_count = animation.frame_count();
            let Some(png) = gif2png::encode_frame(&mut animation, index)? else {
                bail!("frame {index} out of range, {} has frames 0..{frame_count}", input.display());
            };

            let output = output.unwrap_or_else(|| PathBuf::from(format!("frame_{index}.png")));
            fs::write(&output, png).with_context(|| format!("failed to write {}", output.display()))?;
            info!("wrote {}", output.display());
        },
        Command::Export { input, output, base64, batch_size } => {
            let mut animation = open(&input, options)?;
            let export_options = ExportOptions { batch_size };
            if base64 {
                export_base64(&mut animation, &export_options)?;
            } else {
                export_files(&mut animation, &export_options, &output)?;
            }
        },
    }

    Ok(())
}

fn open(path: &Path, options: DecodeOptions) -> Result<Animation> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    gif2png::decode_with_options(BufReader::new(file), options)
        .with_context(|| format!("failed to parse {}", path.display()))
}

fn export_files(animation: &mut Animation, options: &ExportOptions, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut next_index = 0;
    let mut result = Ok(());
    gif2png::export_frames(animation, options, |batch| {
        for png in batch.frames {
            let path = dir.join(format!("frame_{next_index}.png"));
            next_index += 1;

            let Some(png) = png else {
                continue;
            };
            if let Err(err) = fs::write(&path, png) {
                result = Err(err).with_context(|| format!("failed to write {}", path.display()));
                return ControlFlow::Break(());
            }
        }

        info!("exported {} of {} frames", batch.progress.loaded, batch.progress.total);
        ControlFlow::Continue(())
    });

    result
}

fn export_base64(animation: &mut Animation, options: &ExportOptions) -> Result<()> {
    let mut stdout = BufWriter::new(io::stdout().lock());
    let mut result = Ok(());

    gif2png::export_frames(animation, options, |batch| {
        let line = BatchLine {
            progress: batch.progress,
            frames: batch
                .frames
                .iter()
                .map(|png| png.as_deref().map(gif2png::to_data_uri))
                .collect(),
        };

        let written = serde_json::to_writer(&mut stdout, &line)
            .map_err(anyhow::Error::from)
            .and_then(|()| writeln!(stdout).map_err(anyhow::Error::from));
        match written {
            Ok(()) => ControlFlow::Continue(()),
            Err(err) => {
                result = Err(err.context("failed to write export batch"));
                ControlFlow::Break(())
            },
        }
    });

    result?;
    stdout.flush()?;
    Ok(())
}
