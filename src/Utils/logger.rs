use crate::reconstruction::pipeline::ReconstructionOutput;
use chrono::Local;
use csv::Writer;
use simplelog::*;
use std::fs::File;
use std::path::Path;

/// Maps a level name to a filter; `None` for anything unknown.
pub fn parse_loglevel(level: &str) -> Option<LevelFilter> {
    match level.trim().to_lowercase().as_str() {
        "debug" => Some(LevelFilter::Debug),
        "info" => Some(LevelFilter::Info),
        "warn" => Some(LevelFilter::Warn),
        "error" => Some(LevelFilter::Error),
        "off" => Some(LevelFilter::Off),
        _ => None,
    }
}

/// Terminal logger, plus a `log_<date_time>.txt` file logger when `log_to_file` is set.
///
/// A second call keeps the logger installed by the first one.
pub fn init_logger(loglevel: Option<&str>, log_to_file: bool) -> Result<(), String> {
    let log_option = match loglevel {
        Some(level) => parse_loglevel(level)
            .ok_or_else(|| format!("loglevel must be debug, info, warn, error or off, got '{}'", level))?,
        None => LevelFilter::Info,
    };
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        log_option,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if log_to_file {
        let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let name = format!("log_{}.txt", date_and_time);
        let file = File::create(&name).map_err(|e| format!("cannot create {}: {}", name, e))?;
        loggers.push(WriteLogger::new(log_option, Config::default(), file));
    }
    // already initialised
    let _ = CombinedLogger::init(loggers);
    Ok(())
}

/// Writes the grid and the sampled curves as CSV columns `x, f, f', f''`.
pub fn save_results_to_csv(output: &ReconstructionOutput, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = Writer::from_path(path)?;
    let mut headers = vec!["x", "f(x)", "f'(x)"];
    if output.fdoubleprime_values.is_some() {
        headers.push("f''(x)");
    }
    writer.write_record(&headers)?;
    for i in 0..output.grid.len() {
        let mut row = vec![
            output.grid[i].to_string(),
            output.f_values[i].to_string(),
            output.fprime_values[i].to_string(),
        ];
        if let Some(fpp) = &output.fdoubleprime_values {
            row.push(fpp[i].to_string());
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruction::evaluator::GRID_SIZE;
    use crate::reconstruction::pipeline::{FunctionReconstruction, ReconstructionInput};
    use tempfile::tempdir;

    #[test]
    fn test_parse_loglevel() {
        assert_eq!(parse_loglevel("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_loglevel(" WARN "), Some(LevelFilter::Warn));
        assert_eq!(parse_loglevel("verbose"), None);
        assert!(init_logger(Some("verbose"), false).is_err());
    }

    #[test]
    fn test_save_results_to_csv() {
        let input = ReconstructionInput {
            fprime: "3*x^2".to_string(),
            fdoubleprime: "6*x".to_string(),
            ic_fprime: "0,0".to_string(),
            ..ReconstructionInput::default()
        };
        let output = FunctionReconstruction::new(input).run().unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("result.csv");
        save_results_to_csv(&output, &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 4);
        assert_eq!(&headers[3], "f''(x)");
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), GRID_SIZE);
        // x = -5: f = -125, f' = 75, f'' = -30
        assert_eq!(&rows[0][0], "-5");
        assert_eq!(rows[0][1].parse::<f64>().unwrap(), -125.0);
        assert_eq!(rows[0][2].parse::<f64>().unwrap(), 75.0);
        assert_eq!(rows[0][3].parse::<f64>().unwrap(), -30.0);
    }
}
