use tree_decomp::config::DecompConfig;
use tree_decomp::forest::{self, DecisionTree, Forest};
use tree_decomp::merge::{self, Decomposition};
use tree_decomp::range_query::QuerySet;
use tree_decomp::bound;

use kdam::tqdm;
use glob::glob;
use log::{info, warn};
use rand::{SeedableRng, rngs::StdRng};
use std::fs;
use std::fs::File;
use std::io::prelude::*;


use clap::Parser;
#[derive(Parser, Debug)] #[command(author, version, about, long_about = None)]
struct Args {

    //Which task to carry out: decompose, count or validate
    #[arg(short, long)]
    task: String,

    //Forest json file, or a glob of per-tree json files
    #[arg(short, long)]
    input: Option<String>,

    //Yaml config, defaults are used if missing
    #[arg(short, long)]
    config: Option<String>,

    //Output dirname, overrides the config
    #[arg(short, long)]
    output_dirname: Option<String>,

    //Number of features, required when reading per-tree files
    #[arg(short, long)]
    dim: Option<usize>,

    //Validate on random forests with this seed instead of an input forest
    #[arg(short, long)]
    seed: Option<u64>,
}

type AnyResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() -> AnyResult<()> {

    env_logger::init();

    let args = Args::parse();
    dbg!(&args);

    let mut config = match &args.config {
        None => DecompConfig::default(),
        Some(filename) => DecompConfig::from_file(filename)?,
    };

    if let Some(dirname) = &args.output_dirname {
        config.output_directory = dirname.clone();
    }

    match args.task.as_str() {
        "decompose" => decompose(&args, &config),
        "count" => count(&args, &config),
        "validate" => validate(&args, &config),
        _ => Err(format!("Unknown task: {}", args.task).into()),
    }
}

fn load_forest(args: &Args) -> AnyResult<Forest> {

    let input = match &args.input {
        None => return Err("--input is required for this task".into()),
        Some(x) => x,
    };

    if !input.contains('*') {
        let forest = Forest::from_file(input)?;
        info!("loaded {} trees from {}", forest.num_trees(), input);
        return Ok(forest);
    }

    let n_features = match args.dim {
        None => return Err("--dim is required when reading per-tree files".into()),
        Some(x) => x,
    };

    let mut filenames: Vec<String> = Vec::new();
    for entry in glob(input)? {
        filenames.push(entry?.into_os_string().into_string().map_err(|s| format!("non utf-8 path {:?}", s))?);
    }
    filenames.sort();

    let mut trees: Vec<DecisionTree> = Vec::with_capacity(filenames.len());
    for filename in tqdm!(filenames.iter()) {
        trees.push(DecisionTree::from_file(filename)?);
    }

    info!("loaded {} trees from {}", trees.len(), input);

    return Ok(Forest { n_features, trees });
}

fn decompose(args: &Args, config: &DecompConfig) -> AnyResult<()> {

    let forest = load_forest(args)?;

    let decomposition = merge::decompose_random_forest(&forest, config)?;

    fs::create_dir_all(&config.output_directory)?;
    config.to_file(&config.get_config_filename())?;

    write_outputs(&decomposition, config)?;

    println!("TREES: {}", decomposition.num_trees);
    println!("ROUNDS: {}", decomposition.rounds);
    println!("DERIVED REGION SETS: {}", decomposition.derived().len());
    println!("DEGENERATE LEAVES: {}", decomposition.degenerate.len());

    Ok(())
}

fn write_outputs(decomposition: &Decomposition, config: &DecompConfig) -> AnyResult<()> {

    let base_bounds = decomposition.base().iter().flat_map(|s| s.bounds.iter());
    bound::write_bounds_to_file(base_bounds, &config.get_base_bounds_filename())?;

    let derived_bounds = decomposition.derived().iter().flat_map(|s| s.bounds.iter());
    bound::write_bounds_to_file(derived_bounds, &config.get_bounds_filename())?;

    let query_set = QuerySet::from_decomposition(decomposition, config.sentinel);
    query_set.to_file(&config.get_query_set_filename())?;

    let summary = serde_yaml::to_string(&decomposition.summary())?;
    let mut file = File::create(config.get_summary_filename())?;
    file.write_all(summary.as_bytes())?;

    info!("wrote {} range queries to {}", query_set.len(), config.output_directory);

    Ok(())
}

fn count(args: &Args, config: &DecompConfig) -> AnyResult<()> {

    let forest = load_forest(args)?;
    forest.validate()?;

    let num_queries = forest.count_range_queries(config)?;
    let runtime = forest::estimate_runtime(num_queries, forest::DEFAULT_SEC_PER_QUERY);

    println!("RANGE QUERIES: {}", num_queries);
    println!("ESTIMATED RUNTIME (s): {}", runtime);

    Ok(())
}

fn validate(args: &Args, config: &DecompConfig) -> AnyResult<()> {

    let forests: Vec<Forest> = match args.seed {
        None => vec![load_forest(args)?],
        Some(seed) => {
            let mut rng = StdRng::seed_from_u64(seed);
            let dim = args.dim.unwrap_or(2);
            (0..20).map(|_| Forest::random(&mut rng, 8, 4, dim)).collect()
        },
    };

    let mut num_mismatches = 0;

    for (i, forest) in tqdm!(forests.iter().enumerate()) {

        let (base, _) = forest::decompose_trees(forest, config)?;
        let exhaustive = merge::exhaustive_merge(&base)?;
        let (sets, rounds) = merge::merge_forest_bounds(base, config)?;

        let (missed, extra) = merge::compare_with_exhaustive(&sets, &exhaustive);

        info!("forest {}: {} overlapping tree sets, {} rounds", i, exhaustive.len(), rounds);

        if !missed.is_empty() || !extra.is_empty() {
            warn!("forest {}: pruned merge missed {:?}, found extra {:?}", i, missed, extra);
            num_mismatches += 1;
        }
    }

    println!("FORESTS CHECKED: {}", forests.len());
    println!("MISMATCHES: {}", num_mismatches);

    if num_mismatches > 0 {
        return Err(format!("{} forests disagree with the exhaustive merge", num_mismatches).into());
    }

    Ok(())
}
