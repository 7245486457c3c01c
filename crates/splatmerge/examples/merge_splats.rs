use splatmerge::{merge_splat_files, SplatMergeOptions};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let [_, path_a, path_b, output] = args.as_slice() else {
        eprintln!("usage: merge_splats <a.ply> <b.ply> <output.ply>");
        std::process::exit(1);
    };

    let summary = merge_splat_files(path_a, path_b, output, &SplatMergeOptions::default())?;
    println!(
        "merged {} + {} splats into {} ({} iterations, error {:.6}, scale {:.4})",
        summary.points_a,
        summary.points_b,
        summary.points_out,
        summary.num_iterations,
        summary.align_error,
        summary.scale
    );
    Ok(())
}
