use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use sqlpipe::config::Config;
use sqlpipe::store::{Stores, TableCatalog, ViewStore};
use sqlpipe::translate::{self, StatementKind};

/// Translate a SQL statement into a PipeQL log query.
#[derive(Parser)]
#[command(name = "sqlpipe", version, about)]
struct Cli {
    /// JSON configuration file with tables and the views directory.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Views directory, overriding the configuration file.
    #[arg(long)]
    views_dir: Option<PathBuf>,

    /// Extra table mapping as NAME=EXPR; repeatable.
    #[arg(long = "table", value_name = "NAME=EXPR")]
    tables: Vec<String>,

    /// The SQL statement; read from stdin when omitted.
    sql: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("sqlpipe: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json(&std::fs::read_to_string(path)?)?,
        None => {
            let mut config = Config::default();
            config.apply_defaults();
            config
        }
    };
    if let Some(dir) = &cli.views_dir {
        config.views_dir = dir.display().to_string();
    }
    for entry in &cli.tables {
        let Some((name, expr)) = entry.split_once('=') else {
            return Err(format!("invalid --table value {entry:?}, expected NAME=EXPR").into());
        };
        config.tables.insert(name.to_string(), expr.to_string());
    }

    let tables = TableCatalog::new(config.tables)?;
    let views = ViewStore::new(&config.views_dir)?;
    let stores = Stores::new(tables, Some(views));

    let sql_text = match cli.sql {
        Some(sql) => sql,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let mut parser = sqlpipe::sql::Parser::new(&sql_text);
    let stmt = parser.parse_statement();
    let errors = parser.take_errors();
    if !errors.is_empty() {
        for err in &errors {
            eprintln!("sqlpipe: {err}");
        }
        return Err(format!("{} syntax error(s)", errors.len()).into());
    }
    let Some(stmt) = stmt else {
        return Err("no statement found".into());
    };

    let info = translate::statement_info(&stmt, &stores)?;
    match info.kind {
        StatementKind::ShowTables | StatementKind::ShowViews => print!("{}", info.data),
        _ => {
            if !info.pipeql.is_empty() {
                println!("{}", info.pipeql);
            }
        }
    }
    Ok(())
}
