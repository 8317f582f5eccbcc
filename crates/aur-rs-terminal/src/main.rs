use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use aur_rs::AurRsConfig;
use aur_rs::dependency_resolver::*;
use aur_rs::installer::InstallOptions;
use aur_rs::local_index::{LocalDb, LocalIndex};
use aur_rs::registry::{Registry, RpcClient, SearchField};

/// Exit status when the requested packages can't be resolved without the user stepping in.
const EXIT_MANUAL_INTERVENTION: u8 = 4;

#[tokio::main]
async fn main() -> ExitCode {
	let mut opts;

	/* Parse console input */
	let parsed_options = {
		let args: Vec<String> = std::env::args().collect();

		opts = getopts::Options::new();
		opts.optflag( "h", "help",      "Show help");
		opts.optflag( "D", "debug",     "Enable debug logging");
		opts.optflag( "S", "sync",      "Install packages from the AUR");
		opts.optflag( "s", "search",    "With -S, search the AUR instead of installing");
		opts.optflag( "g", "graph",     "Write the dependency graph of the packages as DOT to the path given last");
		opts.optflag( "",  "noconfirm", "Don't ask before installing");
		opts.parsing_style(getopts::ParsingStyle::FloatingFrees);

		let parsed_options = match opts.parse(&args[1..]) {
			Ok(m)  => { m }
			Err(e) => { eprintln!("Unable to parse options: {}", e); return ExitCode::FAILURE }
		};

		if parsed_options.opt_present("h") {
			eprintln!("{}", opts.usage("Usage: aur-rs [-D] -S [-s] [--noconfirm] <packages...>\n       aur-rs [-D] -g <packages...> <path>"));
			return ExitCode::SUCCESS;
		}

		parsed_options
	};

	let level = if parsed_options.opt_present("D") { log::LevelFilter::Debug } else { log::LevelFilter::Info };
	env_logger::Builder::new()
		.filter_level(level)
		.parse_default_env()
		.init();

	let config = AurRsConfig::load_from_disk().unwrap_or_else(|e| {
		log::warn!("Failed to read config file: {}", e);
		log::warn!("Using default config.");
		AurRsConfig::default()
	});

	if parsed_options.free.is_empty() {
		eprintln!("{}", opts.short_usage("aur-rs"));
		return ExitCode::FAILURE;
	}
	log::debug!("Parameters: {}", parsed_options.free.iter().map(|p| format!("'{}'", p)).collect::<Vec<_>>().join(", "));

	let result = if parsed_options.opt_present("S") {
		if parsed_options.opt_present("s") {
			search(&config, &parsed_options.free).await
		} else {
			sync(&config, &parsed_options.free, parsed_options.opt_present("noconfirm")).await
		}
	} else if parsed_options.opt_present("g") {
		export_graph(&config, &parsed_options.free).await
	} else {
		eprintln!("{}", opts.short_usage("aur-rs"));
		return ExitCode::FAILURE;
	};

	match result {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) if e.requires_manual_intervention() => {
			log::error!("{}", e);
			println!("Cannot resolve dependencies, manual intervention is required");
			ExitCode::from(EXIT_MANUAL_INTERVENTION)
		},
		Err(Error::UserCancelled) => {
			println!("Installation cancelled.");
			ExitCode::FAILURE
		},
		Err(e) => {
			log::error!("{}", e);
			ExitCode::FAILURE
		},
	}
}

fn registry(config: &AurRsConfig) -> Result<Arc<RpcClient>, Error> {
	Ok(Arc::new(RpcClient::from_config(config)?))
}

/// Opens the pacman database, an unreadable database is treated as having nothing installed.
fn local_db(config: &AurRsConfig) -> LocalDb {
	LocalDb::open(config.local_db_path()).unwrap_or_else(|e| {
		log::warn!("Failed to read local package database at {}: {}", config.local_db_path().display(), e);
		LocalDb::default()
	})
}

fn gatherer<'r>(config: &AurRsConfig, registry: &'r dyn Registry, local: &'r dyn LocalIndex) -> MetadataGatherer<'r> {
	MetadataGatherer::new(registry, local)
		.max_concurrent_requests(config.max_concurrent_requests())
		.retry_policy(config.retry_policy())
		.batch_size(config.info_batch_size())
}

/// Prints a question and reads a yes or no answer, an empty answer gives `default`.
fn ask(prompt: &str, default: bool) -> Result<bool, Error> {
	let stdin = std::io::stdin();
	loop {
		println!("{}", prompt);
		let _ = std::io::stdout().flush();
		let mut input = String::new();
		stdin.read_line(&mut input)?;
		match input.trim().to_lowercase().as_str() {
			"" => return Ok(default),
			"y" | "yes" => return Ok(true),
			"n" | "no" => return Ok(false),
			_ => println!("Input invalid."),
		}
	}
}

async fn search(config: &AurRsConfig, terms: &[String]) -> Result<(), Error> {
	use chrono::TimeZone;

	let [term] = terms else {
		return Err(Error::InvalidArguments("search requires exactly one term"));
	};

	let registry = registry(config)?;
	let client = registry.as_ref();
	let results = config.retry_policy().run(|| async move {
		client.search(term, SearchField::NameDesc).await
	}).await?;
	if results.is_empty() {
		println!("No packages found for query '{}'", term);
		return Ok(());
	}

	for (i, result) in results.iter().enumerate() {
		let mut line = format!("{} {} {} ", i + 1, result.name, result.version);
		if let Some(date) = result.out_of_date.and_then(|ts| chrono::Local.timestamp_opt(ts, 0).single()) {
			line += &format!("(Out of date: {})", date.format("%Y-%m-%d"));
		}
		println!("{}\n\t{}", line, result.description.as_deref().unwrap_or_default());
	}
	Ok(())
}

async fn sync(config: &AurRsConfig, packages: &[String], no_confirm: bool) -> Result<(), Error> {
	let registry = registry(config)?;
	let local = Arc::new(local_db(config));

	let found = gatherer(config, registry.as_ref(), local.as_ref()).lookup_many(packages).await;
	for failure in &found.failed {
		log::warn!("Could not look up {}: {}", failure.names.join(", "), failure.error);
	}
	for name in packages {
		if !found.table.contains(name) {
			log::warn!("{} was not found in the AUR, skipping", name);
		}
	}
	let explicit = found.table.records().collect::<Vec<_>>();
	if explicit.is_empty() {
		println!("Nothing to install.");
		return Ok(());
	}
	println!("AUR Explicit ({}): {}", explicit.len(), explicit.iter().map(|r| format!("{}-{}", r.name, r.version)).collect::<Vec<_>>().join(", "));

	let options = if no_confirm {
		InstallOptions { clean_build: true, remove_make_deps: false, no_confirm: true }
	} else {
		if !ask("Proceed with installation? [Y/n]", true)? {
			return Err(Error::UserCancelled);
		}
		InstallOptions {
			clean_build: ask("Clean build? [Y/n]", true)?,
			remove_make_deps: ask("Remove make dependencies after installation? [y/N]", false)?,
			no_confirm: false,
		}
	};

	let finalized = ResolverBuilder::new(registry, local)
		.configure(config)
		.add_packages(explicit.iter().map(|r| r.name.clone()))
		.build()
		.resolve()
		.await?;

	for failure in finalized.failed() {
		log::warn!("Could not look up {}: {}", failure.names.join(", "), failure.error);
	}
	log::debug!("Not in the AUR: {}", finalized.missing().join(", "));
	let dependencies = finalized.dependencies().collect::<Vec<_>>();
	if !dependencies.is_empty() {
		println!("AUR Dependencies ({}): {}", dependencies.len(), dependencies.join(", "));
	}

	aur_rs::installer::install(config, &finalized, &options).await?;
	Ok(())
}

/// Writes the dependency graph without checking it for cycles.
async fn export_graph(config: &AurRsConfig, args: &[String]) -> Result<(), Error> {
	let Some((path, packages)) = args.split_last() else {
		return Err(Error::InvalidArguments("expected packages followed by an output path"));
	};
	if packages.is_empty() {
		return Err(Error::InvalidArguments("expected packages followed by an output path"));
	}

	let registry = registry(config)?;
	let local = local_db(config);
	let gathered = gatherer(config, registry.as_ref(), &local).gather(packages).await?;
	let graph = DependencyGraph::build(packages, &gathered.table);

	log::debug!("Serializing graph to '{}'", path);
	std::fs::write(path, graph.to_dot())?;
	println!("Wrote dependency graph of {} packages to {}", graph.vertex_count(), path);
	Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("registry error: {0}")]
	Registry(#[from] aur_rs::registry::RegistryError),
	#[error("{0}")]
	Resolve(#[from] ResolveError),
	#[error("install failed: {0}")]
	Install(#[from] aur_rs::installer::InstallError),
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("Invalid arguments: {0}")]
	InvalidArguments(&'static str),
	#[error("User cancelled an action")]
	UserCancelled,
}

impl Error {
	fn requires_manual_intervention(&self) -> bool {
		match self {
			Error::Resolve(e) => e.requires_manual_intervention(),
			_ => false,
		}
	}
}
