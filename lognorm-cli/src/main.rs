//! lognorm CLI -- 로그 라인 정규화와 룰셋 관리를 위한 명령줄 도구
//!
//! # 서브커맨드
//! - `normalize`: 파일이나 stdin의 라인을 정규화해 JSON 레코드로 출력
//! - `rules`: 룰셋 목록, 상세 설명, 예제 자가 검증
//! - `config`: 설정 검증과 유효 설정 출력

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::process::ExitCode;

use clap::Parser;

use lognorm_core::config::{GeneralConfig, LognormConfig};

use crate::cli::{Cli, Commands};
use crate::commands::ConfigSource;
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let source = ConfigSource::new(cli.config.clone(), cli.rules.clone());

    // 설정이 깨져 있어도 로깅은 기본값으로 초기화하고, 에러는 각 명령이 보고합니다.
    let general = source
        .load()
        .await
        .map(|config: LognormConfig| config.general)
        .unwrap_or_else(|_| GeneralConfig::default());
    if let Err(e) = logging::init_tracing(&general, cli.log_level.as_deref()) {
        eprintln!("error: {e:#}");
        return ExitCode::from(2);
    }

    tracing::debug!(source = %source.describe(), "lognorm starting");

    match run(cli, &source).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli, source: &ConfigSource) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);

    match cli.command {
        Commands::Normalize(args) => commands::normalize::execute(args, source).await,
        Commands::Rules(args) => commands::rules::execute(args, source, &writer).await,
        Commands::Config(args) => commands::config::execute(args, source, &writer).await,
    }
}
