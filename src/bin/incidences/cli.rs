use std::path::PathBuf;

use clap::{ArgAction, Parser};
use incidences::types::RecordErrorPolicy;

#[allow(clippy::struct_excessive_bools)]
#[derive(Parser, Debug)]
#[command(author, version, about = "Envoie les incidences de Sevilla vers Tinybird", long_about = None)]
pub struct Cli {
    /// Chemin du fichier de configuration TOML.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Construit et logue les événements sans les envoyer.
    #[arg(long, action = ArgAction::SetTrue)]
    pub dry_run: bool,

    /// Autorise les URLs HTTP non chiffrées.
    #[arg(long, action = ArgAction::SetTrue)]
    pub insecure: bool,

    /// Nombre maximal d'envois simultanés (1 = séquentiel).
    #[arg(long, value_parser = clap::value_parser!(usize))]
    pub concurrency: Option<usize>,

    /// Comportement sur une incidence invalide : "abort" ou "skip".
    #[arg(long, value_name = "POLICY")]
    pub on_record_error: Option<RecordErrorPolicy>,

    /// Utilise un layer JSON pour les logs (`--features json-logs`).
    #[arg(long, action = ArgAction::SetTrue)]
    pub json_logs: bool,

    /// Filtre de logs explicite (ex. "incidences=debug").
    #[arg(long, value_name = "FILTER")]
    pub log_filter: Option<String>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
