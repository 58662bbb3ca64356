use std::path::Path;

use anyhow::{Result, bail};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;

use super::command::{Cli, InfoArgs, ReportFormat};
use crate::input::Input;
use crate::timestamp::time_str;
use mpegps::process::result::{
    PackHeaderSummary, ProgramStreamMapSummary, PtsSummary, StreamSummary, SystemHeaderSummary,
};
use mpegps::process::scan::Scanner;
use mpegps::structs::pack_header::MUX_RATE_UNIT_BYTES;
use mpegps::utils::source::ByteSource;
use mpegps::{ParseResult, is_program_stream};

pub fn cmd_info(args: &InfoArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Analyzing Program Stream: {}", args.input.display());

    let Some(result) = analyze_stream(&args.input, multi)? else {
        println!("No pack header start code at the beginning of the file.");
        println!("This doesn't appear to be a valid MPEG Program Stream.");
        return Ok(());
    };

    match args.format {
        ReportFormat::Text => display_report(&result),
        ReportFormat::Json => {
            let report = Report::new(&args.input, &result);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        ReportFormat::Yaml => {
            let report = Report::new(&args.input, &result);
            print!("{}", serde_yaml_ng::to_string(&report)?);
        }
    }

    if cli.strict && !result.is_clean() {
        bail!(
            "{} issue(s) found in {}",
            result.issues.len(),
            args.input.display()
        );
    }

    Ok(())
}

/// Machine-readable report envelope.
#[derive(Serialize)]
struct Report<'a> {
    input: String,
    tool: &'static str,
    tool_version: &'static str,
    #[serde(flatten)]
    result: &'a ParseResult,
}

impl<'a> Report<'a> {
    fn new(input: &Path, result: &'a ParseResult) -> Self {
        Self {
            input: input.display().to_string(),
            tool: env!("CARGO_PKG_NAME"),
            tool_version: env!("CARGO_PKG_VERSION"),
            result,
        }
    }
}

fn analyze_stream(
    input_path: &Path,
    multi: Option<&MultiProgress>,
) -> Result<Option<ParseResult>> {
    let mut input = Input::open(input_path)?;
    if input.is_pipe() {
        log::debug!("Buffered {} bytes from stdin", input.size());
    }

    if !is_program_stream(&input.signature()?) {
        return Ok(None);
    }

    let size = input.size();
    let mut scanner = Scanner::new(input);

    let pb = match multi {
        Some(multi) => {
            let pb = multi.add(ProgressBar::new(size));
            pb.set_style(ProgressStyle::with_template(
                "{bar:40.cyan/blue} {bytes}/{total_bytes} ({percent}%)\n{msg} | elapsed: {elapsed_precise} | ETA: {eta_precise}",
            )?);
            pb.set_message("scanning");

            let handle = pb.clone();
            scanner.set_progress(move |offset, _| handle.set_position(offset));
            Some(pb)
        }
        None => None,
    };

    let start = std::time::Instant::now();
    let result = scanner.run();

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    log::info!(
        "Scanned {} bytes in {:.3}s",
        result.bytes_scanned,
        start.elapsed().as_secs_f64()
    );

    Ok(Some(result))
}

fn display_report(result: &ParseResult) {
    println!();
    println!("MPEG Program Stream Information");
    println!("===============================");
    println!();

    display_overview(result);
    display_pack_headers(&result.pack_headers);
    display_system_headers(&result.system_headers);
    display_program_stream_maps(&result.program_stream_maps);
    display_streams(result);
    display_issues(&result.issues);
}

fn display_overview(result: &ParseResult) {
    let size_mb = result.file_size as f64 / 1_000_000.0;

    println!("Overview");
    println!(
        "  Size                      {size_mb:.2} MB ({} bytes)",
        result.file_size
    );
    println!("  Bytes scanned             {}", result.bytes_scanned);
    match result.program_end_code_offset {
        Some(offset) => println!("  Program end code          at offset {offset}"),
        None => println!("  Program end code          not found"),
    }
    if result.cancelled {
        println!("  Scan                      cancelled");
    }
    println!();
}

fn display_pack_headers(packs: &PackHeaderSummary) {
    println!("Pack Headers");
    println!("  Count                     {}", packs.total_count);
    println!("  MPEG-2 / MPEG-1           {} / {}", packs.mpeg2_count, packs.mpeg1_count);
    if packs.invalid_count > 0 {
        println!("  Invalid                   {}", packs.invalid_count);
    }
    println!("  Stuffing bytes            {}", packs.stuffing_bytes_total);

    let scr = &packs.scr;
    if let (Some(first), Some(last)) = (scr.first_seconds, scr.last_seconds) {
        println!("  First / last SCR          {} / {}", time_str(first), time_str(last));
    }
    match scr.duration_seconds {
        Some(duration) => println!("  SCR span                  {}", time_str(duration)),
        None if scr.backwards_count > 0 => {
            println!("  SCR discontinuities       {}", scr.backwards_count)
        }
        None => {}
    }

    let rate = &packs.mux_rate;
    if let (Some(min), Some(max)) = (rate.min_bytes_per_second, rate.max_bytes_per_second) {
        if min == max {
            println!("  Mux rate                  {} kbps", kbps(min));
        } else {
            println!("  Mux rate                  {} - {} kbps", kbps(min), kbps(max));
        }
    }
    println!();
}

fn display_system_headers(headers: &SystemHeaderSummary) {
    if headers.total_count == 0 && headers.truncated_count == 0 {
        return;
    }

    println!("System Headers");
    println!("  Count                     {}", headers.total_count);
    if headers.truncated_count > 0 {
        println!("  Truncated                 {}", headers.truncated_count);
    }
    if let (Some(min), Some(max)) = (headers.length_min, headers.length_max) {
        println!("  Length                    {min} - {max} bytes");
    }

    if let Some(header) = &headers.first_header {
        println!(
            "  Rate bound                {} kbps",
            kbps(header.rate_bound as u64 * MUX_RATE_UNIT_BYTES)
        );
        println!("  Audio / video bound       {} / {}", header.audio_bound, header.video_bound);
        println!("  Fixed bitrate             {}", header.fixed_flag);
        println!("  Constrained (CSPS)        {}", header.csps_flag);
        println!(
            "  Audio / video lock        {} / {}",
            header.system_audio_lock_flag, header.system_video_lock_flag
        );

        for bound in &header.stream_bounds {
            match bound.buffer_size_bytes {
                Some(bytes) => println!(
                    "    Stream {:#04X}             buffer {} bytes",
                    bound.stream_id, bytes
                ),
                None => println!("    Stream {:#04X}             invalid bound", bound.stream_id),
            }
        }
    }
    println!();
}

fn display_program_stream_maps(maps: &ProgramStreamMapSummary) {
    if maps.total_count == 0 && maps.truncated_count == 0 {
        return;
    }

    println!("Program Stream Map");
    println!("  Count                     {}", maps.total_count);
    if maps.truncated_count > 0 {
        println!("  Truncated                 {}", maps.truncated_count);
    }

    if let Some(map) = &maps.first_map {
        println!("  Version                   {}", map.version);
        for entry in &map.entries {
            println!(
                "    Stream {:#04X}             {} ({:#04X})",
                entry.elementary_stream_id, entry.stream_type_name, entry.stream_type
            );
        }
    }

    if !maps.stream_type_histogram.is_empty() {
        println!("  Stream types");
        for entry in &maps.stream_type_histogram {
            println!("    {:<24}{}", entry.name, entry.count);
        }
    }
    println!();
}

fn display_streams(result: &ParseResult) {
    println!("Elementary Streams");
    println!("  PES packets               {}", result.pes.total_packets);
    println!("  Declared payload          {} bytes", result.pes.total_declared_bytes);

    for stream in &result.pes.streams {
        display_stream(stream);
    }
    println!();
}

fn display_stream(stream: &StreamSummary) {
    println!("  Stream {:#04X} ({})", stream.stream_id, stream.kind);
    println!("    Packets                 {}", stream.packet_count);
    if stream.packet_length_zero_count > 0 {
        println!("    Unbounded packets       {}", stream.packet_length_zero_count);
    }
    println!("    Declared bytes          {}", stream.declared_bytes_total);
    display_pts(&stream.pts);
    if stream.dts_count > 0 {
        println!("    DTS count               {}", stream.dts_count);
    }
}

fn display_pts(pts: &PtsSummary) {
    if pts.count == 0 {
        return;
    }

    println!("    PTS count               {}", pts.count);
    if let (Some(first), Some(last)) = (pts.first_seconds, pts.last_seconds) {
        println!("    First / last PTS        {} / {}", time_str(first), time_str(last));
    }
    match pts.duration_seconds {
        Some(duration) => println!("    Duration                {}", time_str(duration)),
        None if pts.backwards_count > 0 => {
            println!("    PTS discontinuities     {}", pts.backwards_count)
        }
        None => {}
    }
}

fn display_issues(issues: &[String]) {
    if issues.is_empty() {
        return;
    }

    println!("Issues ({})", issues.len());
    for issue in issues {
        println!("  {issue}");
    }
    println!();
}

fn kbps(bytes_per_second: u64) -> String {
    format!("{:.1}", bytes_per_second as f64 * 8.0 / 1000.0)
}
