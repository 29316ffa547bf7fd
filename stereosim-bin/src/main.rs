use stereosim_lib as stereosim;
use stereosim::{AxisAlignment, CahvorModel, CameraEye, FrameLabel, StereoModel};

use anyhow::{anyhow, bail, Context};
use glob::glob;
use log::{info, LevelFilter};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

mod pointing;

use pointing::Pointing;

// Default values for some of the program arguments.
const DEFAULT_VERBOSITY: u32 = 1;

/// Entry point of the program.
fn main() {
    if let Err(err) = parse_args().and_then(run) {
        eprintln!("Error: {:?}", err);
        std::process::exit(1);
    }
}

fn display_help() {
    eprintln!(
        r#"
stereosim-cahvor

CAHVOR camera models of the stereosim rig.

USAGE:
    stereosim-cahvor --model FILE [FLAGS...] [LABEL_FILES...]
    For example:
        stereosim-cahvor --model stereosim_model_v1.yml --eye left
        stereosim-cahvor --model stereosim_model_v1.yml session/*.lbl

Without label files, prints the model of each camera at the PTU zero position.
With label files, prints the model of each captured frame,
pointed at the AZIMUTH and ELEVATION of its label.

FLAGS:
    --help                 # Print this message and exit
    --version              # Print version and exit
    --model file.yml       # Calibration model of the stereo camera
    --eye left|right       # Only this camera (default: both, or the label's Camera)
    --pointing az,el       # Point the model at this PTU azimuth and elevation, in degrees
    --alignment name       # PTU axis alignment, legacy or uniform (default: legacy)
    --verbosity int        # 0: errors, 1: warnings, 2: info, 3: debug, 4: trace (default: {})
"#,
        DEFAULT_VERBOSITY,
    )
}

#[derive(Debug)]
/// Type holding command line arguments.
struct Args {
    model_path: PathBuf,
    eye: Option<CameraEye>,
    pointing: Option<Pointing>,
    alignment: AxisAlignment,
    labels_paths: Vec<PathBuf>,
}

/// Function parsing the command line arguments and returning an Args object or an error.
fn parse_args() -> anyhow::Result<Args> {
    let mut args = pico_args::Arguments::from_env();

    // Retrieve command line arguments.
    let help = args.contains(["-h", "--help"]);
    let version = args.contains(["-v", "--version"]);

    // Check if the --help or --version flags are present.
    if help {
        display_help();
        std::process::exit(0);
    } else if version {
        println!("{}", std::env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    // Logging must be set up before anything else is reported.
    let verbosity = args
        .opt_value_from_str("--verbosity")?
        .unwrap_or(DEFAULT_VERBOSITY);
    env_logger::Builder::new()
        .filter_level(verbosity_filter(verbosity))
        .parse_default_env()
        .init();

    // Mandatory arguments.
    let model_path: PathBuf = args.value_from_str("--model")?;

    // Optional arguments.
    let eye = args.opt_value_from_str("--eye")?;
    let pointing = args.opt_value_from_str("--pointing")?;
    let alignment = args
        .opt_value_from_fn("--alignment", parse_alignment)?
        .unwrap_or_default();

    // Verify that labels paths are correct.
    let free_args = args.free()?;
    let labels_paths = absolute_file_paths(&free_args)?;
    if pointing.is_some() && !labels_paths.is_empty() {
        bail!("--pointing cannot be used with label files, they carry their own pointing");
    }

    Ok(Args {
        model_path,
        eye,
        pointing,
        alignment,
        labels_paths,
    })
}

fn parse_alignment(s: &str) -> anyhow::Result<AxisAlignment> {
    match s.to_lowercase().as_str() {
        "legacy" => Ok(AxisAlignment::Legacy),
        "uniform" => Ok(AxisAlignment::Uniform),
        _ => Err(anyhow!("Unknown alignment {:?}: expected legacy or uniform", s)),
    }
}

fn verbosity_filter(verbosity: u32) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        3 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Retrieve the absolute paths of all files matching the arguments.
fn absolute_file_paths(args: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut abs_paths = Vec::new();
    for path_glob in args {
        let mut paths = paths_from_glob(path_glob)?;
        if paths.is_empty() {
            bail!("No label file matches {}", path_glob);
        }
        abs_paths.append(&mut paths);
    }
    abs_paths
        .iter()
        .map(|p| {
            p.canonicalize()
                .with_context(|| format!("Cannot access {}", p.display()))
        })
        .collect()
}

/// Retrieve the paths of files matching the glob pattern.
fn paths_from_glob(p: &str) -> anyhow::Result<Vec<PathBuf>> {
    let paths = glob(p)?;
    Ok(paths.filter_map(|x| x.ok()).collect())
}

/// Camera model of one captured frame.
#[derive(Debug, Serialize)]
struct FrameModel {
    label: PathBuf,
    eye: CameraEye,
    model: CahvorModel,
}

/// Start actual program with command line arguments successfully parsed.
fn run(args: Args) -> anyhow::Result<()> {
    let stereo = StereoModel::load(&args.model_path)
        .with_context(|| format!("Loading model {}", args.model_path.display()))?;

    let json = if args.labels_paths.is_empty() {
        let eyes = match args.eye {
            Some(eye) => vec![eye],
            None => CameraEye::BOTH.to_vec(),
        };
        let mut models = BTreeMap::new();
        for eye in eyes {
            let model = stereo.cahvor_with(eye, args.alignment)?;
            let model = match args.pointing {
                Some(p) => model.pointed(p.azimuth, p.elevation),
                None => model,
            };
            info!("{} camera: {} model", eye, model.model_type());
            models.insert(eye.to_string(), model);
        }
        serde_json::to_string_pretty(&models)?
    } else {
        let frames = frame_models(&stereo, &args)?;
        serde_json::to_string_pretty(&frames)?
    };
    println!("{}", json);
    Ok(())
}

/// Models of each eye, computed on first use.
struct EyeModels<'a> {
    stereo: &'a StereoModel,
    alignment: AxisAlignment,
    cache: HashMap<CameraEye, CahvorModel>,
}

impl<'a> EyeModels<'a> {
    fn new(stereo: &'a StereoModel, alignment: AxisAlignment) -> Self {
        EyeModels {
            stereo,
            alignment,
            cache: HashMap::new(),
        }
    }

    fn get(&mut self, eye: CameraEye) -> anyhow::Result<&CahvorModel> {
        if !self.cache.contains_key(&eye) {
            let model = self.stereo.cahvor_with(eye, self.alignment)?;
            info!("{} camera: {} model", eye, model.model_type());
            self.cache.insert(eye, model);
        }
        Ok(&self.cache[&eye])
    }
}

/// Compute the pointed model of every frame label.
fn frame_models(stereo: &StereoModel, args: &Args) -> anyhow::Result<Vec<FrameModel>> {
    let mut eye_models = EyeModels::new(stereo, args.alignment);
    let labels_count = args.labels_paths.len();
    info!("Processing {} frame labels ...", labels_count);
    let pb = indicatif::ProgressBar::new(labels_count as u64);
    if labels_count < 2 {
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }

    let mut frames = Vec::with_capacity(labels_count);
    for path in &args.labels_paths {
        let label = FrameLabel::load(path)
            .with_context(|| format!("Loading label {}", path.display()))?;
        let eye = label.camera.or(args.eye).ok_or_else(|| {
            anyhow!(
                "{} does not say which camera took it, use --eye",
                path.display()
            )
        })?;
        let model = label.point(eye_models.get(eye)?);
        frames.push(FrameModel {
            label: path.clone(),
            eye,
            model,
        });
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(frames)
}
