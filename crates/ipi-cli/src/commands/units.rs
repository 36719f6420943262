use crate::cli::{UnitsArgs, UnitsCommands};
use crate::error::{CliError, Result};
use ipi_driver::core::units::{self, Unit};

pub fn run(args: UnitsArgs) -> Result<()> {
    match args.command {
        UnitsCommands::List => print!("{}", format_table()),
        UnitsCommands::Convert { value, from, to } => {
            println!("{}", convert_value(value, &from, to.as_deref())?)
        }
    }
    Ok(())
}

fn format_table() -> String {
    let header = format!("{:<12} {:<16} {:>18}", "UNIT", "DIMENSION", "SI FACTOR");
    let rows = units::STANDARD.iter().map(|(unit, factor)| {
        let dimension = unit.dimension();
        format!(
            "{:<12} {:<16} {:>18.10e} {}",
            unit.name(),
            dimension.to_string(),
            factor,
            dimension.si_symbol()
        )
    });
    std::iter::once(header)
        .chain(rows)
        .map(|line| line + "\n")
        .collect()
}

fn convert_value(value: f64, from: &str, to: Option<&str>) -> Result<String> {
    let from_unit: Unit = units::STANDARD
        .resolve(from)
        .map_err(|e| CliError::Argument(e.to_string()))?;

    match to {
        Some(to) => {
            let to_unit = units::STANDARD
                .resolve_as(to, from_unit.dimension())
                .map_err(|e| CliError::Argument(e.to_string()))?;
            let converted = units::STANDARD
                .convert(value, from_unit, to_unit)
                .map_err(|e| CliError::Argument(e.to_string()))?;
            Ok(format!("{} {} = {:.12e} {}", value, from_unit, converted, to_unit))
        }
        None => Ok(format!(
            "{} {} = {:.12e} {}",
            value,
            from_unit,
            units::to_si(value, from_unit),
            from_unit.dimension().si_symbol()
        )),
    }
}
