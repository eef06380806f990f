use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use env_logger::Env;
use log::info;

use mathwgsl_core::Expr;
use mathwgsl_wgsl::{
    compile, compile_or_zero, function_module, parse_or_zero, sampler_module, Bindings, Domain,
    Fragment, Gradient, GradientMode, Linkage, PlotMode, Sample,
};

/// Compiles a MathJSON formula to WGSL
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// MathJSON input file (stdin if omitted)
    #[clap(short, long)]
    input: Option<PathBuf>,

    /// How the formula is drawn
    #[clap(short, long, value_enum, default_value_t = Mode::Implicit)]
    mode: Mode,

    /// JSON bindings file, merged over the mode's defaults
    #[clap(short, long)]
    bindings: Option<PathBuf>,

    /// What to print
    #[clap(short, long, value_enum, default_value_t = Emit::Linked)]
    emit: Emit,

    /// Finite-difference formula for `--emit gradient`
    #[clap(long, value_enum, default_value_t = GradientArg::Unbalanced)]
    gradient: GradientArg,

    /// Finite-difference step for `--emit gradient`
    #[clap(long, default_value_t = 0.0001)]
    step: f32,

    /// Sample gradients instead of values for `--emit sampler`
    #[clap(long)]
    normals: bool,

    /// Fail on bad input instead of drawing the zero expression
    #[clap(long)]
    strict: bool,
}

#[derive(ValueEnum, Clone, Copy)]
enum Mode {
    Surface,
    Implicit,
}

impl From<Mode> for PlotMode {
    fn from(m: Mode) -> Self {
        match m {
            Mode::Surface => PlotMode::Surface,
            Mode::Implicit => PlotMode::Implicit,
        }
    }
}

#[derive(ValueEnum, Clone, Copy)]
enum Emit {
    /// Bare WGSL expression
    Fragment,
    /// Plain `fn f(pos)`
    Function,
    /// `fn f(pos)` with `@link`/`@export` declarations
    Linked,
    /// Finite-difference `fn df(pos)`
    Gradient,
    /// Grid sampling entry point
    Sampler,
}

#[derive(ValueEnum, Clone, Copy)]
enum GradientArg {
    Unbalanced,
    Central,
}

impl From<GradientArg> for GradientMode {
    fn from(g: GradientArg) -> Self {
        match g {
            GradientArg::Unbalanced => GradientMode::Unbalanced,
            GradientArg::Central => GradientMode::Central,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

fn load_bindings(args: &Args, mode: PlotMode) -> Result<Bindings> {
    let mut bindings = mode.bindings();
    if let Some(path) = &args.bindings {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let extra: Bindings = serde_json::from_str(&text)
            .with_context(|| format!("invalid bindings in {}", path.display()))?;
        bindings.merge(extra);
    }
    Ok(bindings)
}

fn compile_input(args: &Args, bindings: &Bindings) -> Result<Fragment> {
    let text = read_input(args.input.as_ref())?;
    let start = Instant::now();
    let fragment = if args.strict {
        let expr = Expr::parse(&text).context("invalid MathJSON")?;
        compile(&expr, bindings).with_context(|| format!("cannot compile {expr}"))?
    } else {
        compile_or_zero(&parse_or_zero(&text), bindings).fragment
    };
    info!("Compiled in {:?}", start.elapsed());
    Ok(fragment)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mode = PlotMode::from(args.mode);
    let domain: Domain = mode.domain();

    let out = match args.emit {
        Emit::Fragment => {
            let bindings = load_bindings(&args, mode)?;
            compile_input(&args, &bindings)?.into_string()
        }
        Emit::Function | Emit::Linked => {
            let bindings = load_bindings(&args, mode)?;
            let fragment = compile_input(&args, &bindings)?;
            let linkage = match args.emit {
                Emit::Function => Linkage::Standalone,
                _ => Linkage::Linked,
            };
            function_module(&fragment, domain, linkage)
        }
        Emit::Gradient => Gradient {
            mode: args.gradient.into(),
            step: args.step,
        }
        .module(domain, Linkage::Linked),
        Emit::Sampler => {
            let sample = if args.normals {
                Sample::Normals
            } else {
                Sample::Values
            };
            sampler_module(domain, sample)
        }
    };
    println!("{out}");
    Ok(())
}
