use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use makstat_rs::api::QueryClause;
use makstat_rs::viz::{self, ChartKind, ChartSpec, LegendMode};
use makstat_rs::{Client, Cube, Dataset};
use makstat_rs::{stats, storage};

#[derive(Parser, Debug)]
#[command(
    name = "makstat",
    version,
    about = "Fetch, flatten, visualize & summarize MakStat statistical cubes"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a table (and optionally save, plot, and print stats).
    Get(GetArgs),
    /// Print a table's variables (dimension codes and categories).
    Meta(MetaArgs),
}

#[derive(ValueEnum, Clone, Debug)]
enum OutFormat {
    Csv,
    Json,
}

#[derive(ValueEnum, Clone, Debug)]
enum KindArg {
    Bar,
    Line,
    Heatmap,
    Treemap,
    Flow,
}

#[derive(ValueEnum, Clone, Debug)]
enum LegendArg {
    Inside,
    Right,
    Bottom,
}

#[derive(Args, Debug)]
struct GetArgs {
    /// PxWeb table path (e.g. MakStat/Zemjodelstvo/Dobitok/175_ZemBroj_Reg_Dobitok_ml.px)
    #[arg(short, long)]
    table: Option<String>,
    /// Read a saved JSON-stat file instead of fetching (both 1.x and 2.0 shapes).
    #[arg(long, conflicts_with = "table")]
    input: Option<PathBuf>,
    /// API language segment (mk or en).
    #[arg(long, default_value = "mk")]
    lang: String,
    /// Dimension selection as "Dimension=code1,code2". Repeatable.
    #[arg(short, long)]
    select: Vec<String>,
    /// Save flattened rows to file (format inferred by --format or extension).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Output format (csv or json). If omitted, inferred from --out extension.
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
    /// Create a chart at the given path (.svg or .png).
    #[arg(long)]
    plot: Option<PathBuf>,
    /// Chart kind.
    #[arg(long, value_enum, default_value_t = KindArg::Bar)]
    kind: KindArg,
    /// Primary dimension code (defaults to the cube's first dimension).
    #[arg(long)]
    x_dim: Option<String>,
    /// Secondary dimension code (line series, heatmap columns, treemap level 2, flow target).
    #[arg(long)]
    series_dim: Option<String>,
    /// Pin a dimension to one category as "Dimension=code". Repeatable.
    #[arg(long)]
    fix: Vec<String>,
    /// Chart title (defaults to the dataset label).
    #[arg(long)]
    title: Option<String>,
    /// Width of the plot (default 1000).
    #[arg(long, default_value_t = 1000)]
    width: u32,
    /// Height of the plot (default 600).
    #[arg(long, default_value_t = 600)]
    height: u32,
    /// Number formatting locale for chart labels.
    #[arg(long, default_value = "mk")]
    locale: String,
    /// Legend placement for line charts.
    #[arg(long, value_enum, default_value_t = LegendArg::Bottom)]
    legend: LegendArg,
    /// Print grouped statistics to stdout.
    #[arg(long, default_value_t = false)]
    stats: bool,
    /// Dimension to group statistics by (defaults to the first dimension).
    #[arg(long)]
    stats_by: Option<String>,
}

#[derive(Args, Debug)]
struct MetaArgs {
    /// PxWeb table path.
    #[arg(short, long)]
    table: String,
    /// API language segment (mk or en).
    #[arg(long, default_value = "mk")]
    lang: String,
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => {
            // Format up to 4 decimals, then trim trailing zeros and trailing dot.
            let s = format!("{:.4}", x);
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        _ => "NA".to_string(),
    }
}

/// Parse "Dimension=code1,code2" into a selection clause.
fn parse_selection(s: &str) -> Result<QueryClause> {
    let (code, values) = s
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("invalid selection `{}`, expected Dim=code1,code2", s))?;
    let values: Vec<String> = values
        .split([',', ';'])
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect();
    if values.is_empty() {
        anyhow::bail!("selection `{}` has no category codes", s);
    }
    Ok(QueryClause::items(code.trim(), values))
}

/// Parse "Dimension=code" into a fixed-selector pair.
fn parse_fix(s: &str) -> Result<(String, String)> {
    let (dim, code) = s
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("invalid --fix `{}`, expected Dim=code", s))?;
    Ok((dim.trim().to_string(), code.trim().to_string()))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Get(args) => cmd_get(args),
        Command::Meta(args) => cmd_meta(args),
    }
}

fn cmd_get(args: GetArgs) -> Result<()> {
    let cube = load_cube(&args)?;

    if let Some(path) = args.out.as_ref() {
        let rows = cube.rows();
        let fmt = match args.format {
            Some(OutFormat::Csv) => "csv",
            Some(OutFormat::Json) => "json",
            None => path.extension().and_then(|e| e.to_str()).unwrap_or("csv"),
        }
        .to_ascii_lowercase();
        match fmt.as_str() {
            "csv" => storage::save_csv(&rows, path)?,
            "json" => storage::save_json(&rows, path)?,
            other => anyhow::bail!("unsupported format: {}", other),
        }
        eprintln!("Saved {} rows to {}", rows.len(), path.display());
    }

    if let Some(plot_path) = args.plot.as_ref() {
        let x_dim = args
            .x_dim
            .clone()
            .or_else(|| cube.axes().first().map(|a| a.code.clone()))
            .ok_or_else(|| anyhow::anyhow!("cube has no dimensions to plot"))?;
        let kind = match args.kind {
            KindArg::Bar => ChartKind::Bar,
            KindArg::Line => ChartKind::Line,
            KindArg::Heatmap => ChartKind::Heatmap,
            KindArg::Treemap => ChartKind::Treemap,
            KindArg::Flow => ChartKind::Flow,
        };
        let mut spec = ChartSpec::new(kind, x_dim)
            .locale(args.locale.clone())
            .legend(match args.legend {
                LegendArg::Inside => LegendMode::Inside,
                LegendArg::Right => LegendMode::Right,
                LegendArg::Bottom => LegendMode::Bottom,
            });
        if let Some(series) = &args.series_dim {
            spec = spec.series_dim(series.clone());
        }
        if let Some(title) = &args.title {
            spec = spec.title(title.clone());
        }
        for f in &args.fix {
            let (dim, code) = parse_fix(f)?;
            spec = spec.fix(dim, code);
        }
        viz::render_chart(&cube, &spec, plot_path, args.width, args.height)?;
        eprintln!("Wrote plot to {}", plot_path.display());
    }

    if args.stats {
        let by = args
            .stats_by
            .clone()
            .or_else(|| cube.axes().first().map(|a| a.code.clone()))
            .ok_or_else(|| anyhow::anyhow!("cube has no dimensions to group by"))?;
        let rows = cube.rows();
        for s in stats::grouped_summary(&rows, &by) {
            println!(
                "{}  count={} missing={}  min={} max={} mean={} median={}",
                s.key.category,
                s.count,
                s.missing,
                fmt_opt(s.min),
                fmt_opt(s.max),
                fmt_opt(s.mean),
                fmt_opt(s.median)
            );
        }
    }

    Ok(())
}

fn load_cube(args: &GetArgs) -> Result<Cube> {
    if let Some(path) = &args.input {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        let v: serde_json::Value = serde_json::from_str(&text).context("decode json")?;
        let dataset = Dataset::from_json(v).context("parse json-stat file")?;
        return Cube::from_dataset(dataset).context("validate cube");
    }
    let table = args
        .table
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("either --table or --input is required"))?;
    let selections: Vec<QueryClause> = args
        .select
        .iter()
        .map(|s| parse_selection(s))
        .collect::<Result<_>>()?;
    let client = Client::with_lang(args.lang.clone());
    client.fetch_table(table, &selections)
}

fn cmd_meta(args: MetaArgs) -> Result<()> {
    let client = Client::with_lang(args.lang);
    let meta = client.fetch_table_meta(&args.table)?;
    println!("{}", meta.title);
    for var in &meta.variables {
        let flags = match (var.time, var.elimination) {
            (true, _) => " [time]",
            (_, true) => " [optional]",
            _ => "",
        };
        println!("  {}: {}{}", var.code, var.text, flags);
        for (code, text) in var.values.iter().zip(&var.value_texts) {
            println!("    {} = {}", code, text);
        }
    }
    Ok(())
}
