//! Multi-file processing with progress and a summary table.

use std::io::Write;

use super::ProcessContext;

/// Process several inputs in order, emitting each response as it finishes.
pub async fn process_batch(ctx: ProcessContext, inputs: Vec<String>) -> anyhow::Result<()> {
    let progress = create_progress_bar(inputs.len() as u64);

    let mut succeeded: u64 = 0;
    let mut failed: u64 = 0;
    let mut total_bytes: u64 = 0;
    let start_time = std::time::Instant::now();

    for input in &inputs {
        match ctx.process_input(input).await {
            Ok(processed) => {
                succeeded += 1;
                total_bytes += processed.stats.original_size as u64;

                let mut buffer = Vec::new();
                writeln!(buffer, "{input}")?;
                ctx.response.write(&processed, &mut buffer)?;
                progress.suspend(|| {
                    let stdout = std::io::stdout();
                    let mut lock = stdout.lock();
                    lock.write_all(&buffer).and_then(|_| lock.flush())
                })?;
            }
            Err(e) => {
                failed += 1;
                tracing::error!("Failed: {} - {}", input, e);
            }
        }

        progress.inc(1);
        let elapsed = start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let rate = (succeeded + failed) as f64 / elapsed;
            progress.set_message(format!("{:.1} img/sec", rate));
        }
    }

    progress.finish_and_clear();

    let elapsed = start_time.elapsed();
    let rate = if elapsed.as_secs_f64() > 0.0 {
        (succeeded + failed) as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };
    print_summary(succeeded, failed, total_bytes, elapsed, rate);

    if failed > 0 {
        anyhow::bail!("{failed} of {} image(s) failed", inputs.len());
    }
    Ok(())
}

fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )
            .unwrap()
            .progress_chars("##-"),
    );
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after batch processing.
fn print_summary(
    succeeded: u64,
    failed: u64,
    total_bytes: u64,
    elapsed: std::time::Duration,
    rate: f64,
) {
    let total = succeeded + failed;
    let mb_processed = total_bytes as f64 / 1_000_000.0;
    let throughput = if elapsed.as_secs_f64() > 0.0 {
        mb_processed / elapsed.as_secs_f64()
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", succeeded);
    if failed > 0 {
        eprintln!("    Failed:       {:>8}", failed);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", total);
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("    Rate:         {:>7.1} img/sec", rate);
    eprintln!("    Throughput:   {:>7.1} MB/sec", throughput);
    eprintln!("  ====================================");
}
