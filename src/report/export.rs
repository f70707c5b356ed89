//! Diagnosed-data CSV export

use std::io::Write;

use crate::pipeline::PipelineRun;

pub const EXPORT_HEADER: [&str; 9] = [
    "Time", "X", "Y", "Z", "X RMS", "Y RMS", "Z RMS", "Diagnosis", "Severity",
];

const EXPORT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Write every diagnosed row, oldest first.
pub fn write_diagnosed_csv<W: Write>(run: &PipelineRun, writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(EXPORT_HEADER)?;
    for d in &run.diagnosed {
        let s = &d.sample;
        wtr.write_record([
            s.timestamp.format(EXPORT_TIME_FORMAT).to_string(),
            s.x.to_string(),
            s.y.to_string(),
            s.z.to_string(),
            format!("{:.6}", d.rms.x),
            format!("{:.6}", d.rms.y),
            format!("{:.6}", d.rms.z),
            d.diagnosis.to_string(),
            d.severity.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Export into an in-memory buffer.
pub fn diagnosed_csv_bytes(run: &PipelineRun) -> Result<Vec<u8>, csv::Error> {
    let mut buf = Vec::new();
    write_diagnosed_csv(run, &mut buf)?;
    Ok(buf)
}
