#![forbid(unsafe_code)]

use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{Level as TraceLevel, info, warn};
use tracing_subscriber::FmtSubscriber;

use poi_overlay::body::BodyRef;
use poi_overlay::config::persistent::{load_tree, save_tree};
use poi_overlay::config::{BodyCatalog, ConfigPaths};
use poi_overlay::poi::approx_eq;
use poi_overlay::render::CountingBackend;
use poi_overlay::{BodyRegistry, Color, PoiEdit, PoiEntity, PoiOverlay, PoiType, SharedPoi};

#[derive(Parser)]
#[command(name = "poi-overlay", version, about = "Inspect and edit points-of-interest overrides")]
struct Cli {
    /// Directory holding overrides.json and bodies.json
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Body catalog to load instead of <config-dir>/bodies.json
    #[arg(long, global = true)]
    bodies: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the resolved POIs of a body (or the global scope)
    List {
        #[arg(long)]
        body: Option<String>,
    },
    /// Edit a standard POI; values equal to the default drop the override
    Set {
        #[arg(long = "type", value_enum)]
        poi_type: StandardType,

        #[arg(long)]
        body: Option<String>,

        #[arg(long)]
        enabled: Option<bool>,

        /// "R,G,B" or "R,G,B,A"
        #[arg(long, value_parser = parse_color)]
        color: Option<Color>,

        #[arg(long)]
        line_width: Option<f32>,

        #[arg(long)]
        resolution: Option<u32>,
    },
    /// Add (or replace) a custom ring
    AddCustom {
        #[arg(long)]
        radius: f64,

        #[arg(long)]
        body: Option<String>,

        #[arg(long)]
        label: Option<String>,

        #[arg(long, value_parser = parse_color)]
        color: Option<Color>,

        /// Measure the radius from the surface instead of the centre
        #[arg(long)]
        add_planet_radius: bool,
    },
    /// Remove the custom ring with the given radius
    RemoveCustom {
        #[arg(long)]
        radius: f64,

        #[arg(long)]
        body: Option<String>,
    },
    /// Print the maximum terrain altitude of every body
    Altitudes,
    /// Drop every override
    Reset,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum StandardType {
    HillSphere,
    SphereOfInfluence,
    MinimumOrbit,
    Atmosphere,
    MaxTerrainAltitude,
}

impl From<StandardType> for PoiType {
    fn from(value: StandardType) -> Self {
        match value {
            StandardType::HillSphere => PoiType::HillSphere,
            StandardType::SphereOfInfluence => PoiType::SphereOfInfluence,
            StandardType::MinimumOrbit => PoiType::MinimumOrbit,
            StandardType::Atmosphere => PoiType::Atmosphere,
            StandardType::MaxTerrainAltitude => PoiType::MaxTerrainAltitude,
        }
    }
}

fn parse_color(text: &str) -> Result<Color, String> {
    Color::parse(text).ok_or_else(|| format!("invalid color '{text}', expected R,G,B or R,G,B,A"))
}

fn scope(registry: &BodyRegistry, name: Option<&str>) -> Result<Option<BodyRef>> {
    match name {
        None => Ok(None),
        Some(name) => match registry.resolve_by_name(Some(name)) {
            Some(body) => Ok(Some(body)),
            None => bail!("unknown body '{name}'"),
        },
    }
}

fn print_pois(overlay: &PoiOverlay<CountingBackend>, pois: &[SharedPoi]) {
    let overrides = overlay.resolver().overrides();
    for poi in pois {
        let source = if overrides.iter().any(|o| o.ptr_eq(poi)) { "override" } else { "default" };
        poi.with(|p| {
            println!(
                "{:<20} {:<24} enabled={:<5} radius={:<14} color={:<15} width={} resolution={} [{}]",
                p.poi_type(),
                p.label(),
                p.enabled(),
                p.radius_for_rendering(),
                p.color(),
                p.line_width(),
                p.resolution(),
                source,
            );
        });
    }
}

fn main() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let paths = cli.config_dir.map(ConfigPaths::new).unwrap_or_default();
    let bodies_path = cli.bodies.unwrap_or_else(|| paths.bodies());

    let registry = Rc::new(BodyCatalog::load(&bodies_path)?.into_registry());
    if registry.bodies().is_empty() {
        warn!("No bodies loaded from {:?}, only the global scope is available", bodies_path);
    }
    let overlay = PoiOverlay::new(registry.clone(), CountingBackend::default());
    if let Some(tree) = load_tree(&paths.overrides())? {
        overlay.load(&tree);
    }
    let resolver = overlay.resolver();

    let modified = match cli.command {
        Command::List { body } => {
            let body = scope(&registry, body.as_deref())?;
            let mut pois = resolver.get_standard_pois_for(body.as_ref());
            pois.extend(resolver.get_custom_pois_for(body.as_ref()));
            print_pois(&overlay, &pois);
            let visible = overlay.sync_frame(body.as_ref());
            println!("{} of {} visible", visible.len(), pois.len());
            false
        }
        Command::Set { poi_type, body, enabled, color, line_width, resolution } => {
            let body = scope(&registry, body.as_deref())?;
            let poi_type = PoiType::from(poi_type);
            let edits: Vec<PoiEdit> = [
                enabled.map(PoiEdit::Enabled),
                color.map(PoiEdit::Color),
                line_width.map(PoiEdit::LineWidth),
                resolution.map(PoiEdit::Resolution),
            ]
            .into_iter()
            .flatten()
            .collect();
            if edits.is_empty() {
                bail!("nothing to set, pass at least one of --enabled, --color, --line-width, --resolution");
            }
            // Editing a default promotes it, so re-resolve before every edit
            for edit in edits {
                resolver.resolve_poi_for(body.as_ref(), poi_type)?.edit(edit)?;
            }
            let poi = resolver.resolve_poi_for(body.as_ref(), poi_type)?;
            print_pois(&overlay, &[poi]);
            true
        }
        Command::AddCustom { radius, body, label, color, add_planet_radius } => {
            let body = scope(&registry, body.as_deref())?;
            let mut poi = PoiEntity::default_from(PoiType::Custom, body, &registry);
            poi.apply(PoiEdit::Radius(radius))?;
            poi.apply(PoiEdit::Label(label))?;
            if let Some(color) = color {
                poi.apply(PoiEdit::Color(color))?;
            }
            poi.apply(PoiEdit::AddPlanetRadius(add_planet_radius))?;
            let poi = resolver.add_poi(poi)?;
            print_pois(&overlay, &[poi]);
            true
        }
        Command::RemoveCustom { radius, body } => {
            let body = scope(&registry, body.as_deref())?;
            let Some(poi) = resolver
                .get_custom_pois_for(body.as_ref())
                .into_iter()
                .find(|p| approx_eq(p.radius(), radius))
            else {
                bail!("no custom POI with radius {radius}");
            };
            resolver.remove_poi(&poi)
        }
        Command::Altitudes => {
            let mut altitudes: Vec<(String, f64)> = registry.max_altitudes().into_iter().collect();
            altitudes.sort_by(|a, b| a.0.cmp(&b.0));
            for (name, altitude) in altitudes {
                println!("{name:<16} {altitude}");
            }
            false
        }
        Command::Reset => {
            resolver.reset();
            true
        }
    };

    if modified {
        save_tree(&paths.overrides(), &overlay.save())?;
        info!("{} overrides saved", resolver.overrides().len());
    }
    Ok(())
}
