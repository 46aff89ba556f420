use crate::quorum::QuorumResult;
use rust_decimal::{Decimal, RoundingStrategy};
use std::io::Write;

pub const CSV_HEADER: [&str; 3] = ["Zone", "Staker", "Share"];

const STAKER_COLUMN_WIDTH: usize = 33;
const SHARE_COLUMN_WIDTH: usize = 5;
const ZONE_COLUMN_WIDTH: usize = 18;
const COUNT_COLUMN_WIDTH: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Percentage rounded to three decimals and then cut down to two, so
/// `33.3349` is reported as `33.33` and `9.9996` as `10.00`.
///
/// Rounding works on the exact binary value of `share`: `9.9995` is stored as
/// `9.99949999..` and is reported as `9.99`.
pub fn format_share(share: f64) -> String {
    match Decimal::from_f64_retain(share) {
        Some(share) => {
            let share = share
                .round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
                .round_dp_with_strategy(2, RoundingStrategy::ToZero);
            format!("{:.2}", share)
        }
        None => format!("{:.2}", share),
    }
}

/// Monikers are free text: surrounding whitespace is dropped and commas are
/// replaced so that they cannot break a csv row.
pub fn sanitize_moniker(moniker: &str) -> String {
    moniker.trim().replace(',', ";")
}

/// Writes one `Zone,Staker,Share` row per quorum member, with CRLF line endings.
pub fn write_csv<W: Write>(writer: W, results: &[QuorumResult]) -> Result<(), Error> {
    let mut csv_writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer);
    csv_writer.write_record(&CSV_HEADER)?;

    for result in results {
        for member in &result.members {
            let record = [
                result.zone.name.clone(),
                sanitize_moniker(&member.staker),
                format_share(member.share),
            ];
            csv_writer.write_record(&record)?;
        }
    }

    csv_writer.flush()?;
    Ok(())
}

/// Human readable report: the quorum of every zone, followed by the zones
/// sorted from the least to the most secure.
pub fn write_console<W: Write>(mut writer: W, results: &[QuorumResult]) -> Result<(), Error> {
    for result in results {
        writeln!(writer)?;
        writeln!(
            writer,
            "\nNumber of validators required to compromise {}: {}\n",
            result.zone.name, result.threshold_count
        )?;

        for member in &result.members {
            writeln!(
                writer,
                " - {:.<staker_width$} {:>share_width$} %",
                member.staker.trim(),
                format_share(member.share),
                staker_width = STAKER_COLUMN_WIDTH,
                share_width = SHARE_COLUMN_WIDTH,
            )?;
        }
    }

    writeln!(
        writer,
        "\n\n\n Number of validators that could compromise security:\n"
    )?;

    let mut summary = results.iter().collect::<Vec<_>>();
    summary.sort_by_key(|result| result.threshold_count);

    for result in summary {
        writeln!(
            writer,
            " {:<zone_width$} {:>count_width$}",
            format!("{}:", result.zone.name),
            result.threshold_count,
            zone_width = ZONE_COLUMN_WIDTH,
            count_width = COUNT_COLUMN_WIDTH,
        )?;
    }

    writeln!(writer)?;
    Ok(())
}
