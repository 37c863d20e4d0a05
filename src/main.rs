use std::error::Error;
use std::path::Path;
use std::time::Instant;

use clap::{Arg, ArgAction, ArgMatches, Command};
use env_logger::Env;
use log::{info, warn};

use wine_preprocess::{Dataset, DegeneratePolicy, OneSidedParams, OneSidedScaler, ScalerConfig};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let matches = Command::new("wine_preprocess")
        .version("0.1.0")
        .about("One-sided feature scaling for CSV datasets")
        .subcommand_required(true)
        .subcommand(
            Command::new("fit")
                .about("Learn scaler statistics and save them as a pickle")
                .arg(input_arg())
                .arg(params_arg().required(true))
                .arg(columns_arg())
                .arg(delimiter_arg()),
        )
        .subcommand(
            Command::new("transform")
                .about("Scale a dataset with previously saved statistics")
                .arg(input_arg())
                .arg(params_arg().required(true))
                .arg(output_arg())
                .arg(delimiter_arg())
                .arg(degenerate_arg()),
        )
        .subcommand(
            Command::new("fit-transform")
                .about("Learn statistics from a dataset and scale it")
                .arg(input_arg())
                .arg(output_arg())
                .arg(params_arg())
                .arg(columns_arg())
                .arg(delimiter_arg())
                .arg(degenerate_arg()),
        )
        .get_matches();

    let now = Instant::now();
    match matches.subcommand() {
        Some(("fit", args)) => fit(args)?,
        Some(("transform", args)) => transform(args)?,
        Some(("fit-transform", args)) => fit_transform(args)?,
        _ => unreachable!("subcommand is required"),
    }

    let elapsed = now.elapsed();
    info!("Elapsed: {:.2?}", elapsed);
    Ok(())
}

fn input_arg() -> Arg<'static> {
    Arg::new("Input")
        .long("input")
        .short('i')
        .help("CSV file with a header row")
        .action(ArgAction::Set)
        .require_equals(true)
        .required(true)
}

fn output_arg() -> Arg<'static> {
    Arg::new("Output")
        .long("output")
        .short('o')
        .help("Where to write the scaled CSV")
        .action(ArgAction::Set)
        .require_equals(true)
        .required(true)
}

fn params_arg() -> Arg<'static> {
    Arg::new("Params")
        .long("params")
        .short('p')
        .help("Pickle file holding fitted scaler statistics")
        .action(ArgAction::Set)
        .require_equals(true)
}

fn columns_arg() -> Arg<'static> {
    Arg::new("Columns")
        .long("columns")
        .help("Comma separated columns to scale. Defaults to all columns")
        .action(ArgAction::Set)
        .require_equals(true)
}

fn delimiter_arg() -> Arg<'static> {
    Arg::new("Delimiter")
        .long("delimiter")
        .short('d')
        .help("Field delimiter, a single character")
        .action(ArgAction::Set)
        .require_equals(true)
        .default_value(",")
}

fn degenerate_arg() -> Arg<'static> {
    Arg::new("OnDegenerate")
        .long("on-degenerate")
        .help("What to do with zero-extent columns: error, zero or non-finite")
        .action(ArgAction::Set)
        .require_equals(true)
        .default_value("error")
}

fn fit(args: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let delimiter = delimiter(args)?;
    let dataset = load(args, delimiter)?;
    let columns = columns(args, &dataset);
    let selected = dataset.select(&columns)?;

    let mut scaler = OneSidedScaler::default();
    scaler.fit(&selected.values)?;

    let params_path = args.get_one::<String>("Params").unwrap();
    save_params(&scaler, columns, params_path)?;
    Ok(())
}

fn transform(args: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let delimiter = delimiter(args)?;
    let mut dataset = load(args, delimiter)?;

    let params_path = args.get_one::<String>("Params").unwrap();
    let params = OneSidedParams::load(params_path)?;
    let columns = if params.columns.is_empty() {
        dataset.headers.clone()
    } else {
        params.columns.clone()
    };

    let scaler = OneSidedScaler::from_params(&params, config(args)?)?;
    let scaled = scaler.transform(&dataset.select(&columns)?.values)?;
    dataset.set_columns(&columns, &scaled)?;

    write_output(&dataset, args, delimiter)
}

fn fit_transform(args: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let delimiter = delimiter(args)?;
    let mut dataset = load(args, delimiter)?;
    let columns = columns(args, &dataset);

    let mut scaler = OneSidedScaler::new(config(args)?);
    let scaled = scaler.fit_transform(&dataset.select(&columns)?.values)?;
    dataset.set_columns(&columns, &scaled)?;

    if let Some(params_path) = args.get_one::<String>("Params") {
        save_params(&scaler, columns, params_path)?;
    }
    write_output(&dataset, args, delimiter)
}

fn load(args: &ArgMatches, delimiter: u8) -> Result<Dataset, Box<dyn Error>> {
    let input = args.get_one::<String>("Input").unwrap();
    Ok(Dataset::from_csv_path(input, delimiter)?)
}

fn columns(args: &ArgMatches, dataset: &Dataset) -> Vec<String> {
    parse_columns(args.get_one::<String>("Columns").map(String::as_str), &dataset.headers)
}

fn parse_columns(list: Option<&str>, headers: &[String]) -> Vec<String> {
    match list {
        Some(list) => list
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
        None => headers.to_vec(),
    }
}

fn delimiter(args: &ArgMatches) -> Result<u8, Box<dyn Error>> {
    parse_delimiter(args.get_one::<String>("Delimiter").unwrap())
}

fn parse_delimiter(raw: &str) -> Result<u8, Box<dyn Error>> {
    match raw {
        "\\t" | "tab" => Ok(b'\t'),
        s if s.len() == 1 => Ok(s.as_bytes()[0]),
        s => Err(format!("delimiter must be a single byte, got {:?}", s).into()),
    }
}

fn config(args: &ArgMatches) -> Result<ScalerConfig, Box<dyn Error>> {
    let policy = args
        .get_one::<String>("OnDegenerate")
        .unwrap()
        .parse::<DegeneratePolicy>()?;
    if policy != DegeneratePolicy::Error {
        warn!("degenerate columns will not fail the transform ({:?})", policy);
    }
    Ok(ScalerConfig::default().with_degenerate_policy(policy))
}

fn save_params(scaler: &OneSidedScaler, columns: Vec<String>, path: &str) -> Result<(), Box<dyn Error>> {
    ensure_parent(path)?;
    scaler.params()?.with_columns(columns).save(path)?;
    info!("saved scaler statistics to {}", path);
    Ok(())
}

fn write_output(dataset: &Dataset, args: &ArgMatches, delimiter: u8) -> Result<(), Box<dyn Error>> {
    let output = args.get_one::<String>("Output").unwrap();
    ensure_parent(output)?;
    dataset.write_csv(output, delimiter)?;
    Ok(())
}

fn ensure_parent(path: &str) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs_extra::dir::create_all(parent, false)?;
        }
    }
    Ok(())
}
