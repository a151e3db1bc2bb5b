//! Plain-text plots for logging schedules and training curves.

/// Plot a series as ASCII art, oldest value on the left.
pub fn plot_metrics(values: &[f32], title: &str, width: usize, height: usize) -> String {
    if values.is_empty() || width < 10 || height < 5 {
        return format!("{}: Invalid data or dimensions", title);
    }

    let min_val = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max_val = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    if (max_val - min_val).abs() < f32::EPSILON {
        return format!("{}: All values are {:.4}", title, min_val);
    }

    let mut grid = vec![vec![' '; width]; height];
    for row in grid.iter_mut() {
        row[0] = '|';
    }
    for cell in grid[height - 1].iter_mut() {
        *cell = '-';
    }
    grid[height - 1][0] = '+';

    // Columns 2..width and rows 0..height-2 hold data
    let plot_width = width - 2;
    let plot_height = height - 2;
    let last = (values.len() - 1).max(1) as f32;
    let y_scale = (plot_height - 1) as f32 / (max_val - min_val);

    for (i, &value) in values.iter().enumerate() {
        let x = 2 + ((i as f32 / last) * (plot_width - 1) as f32).round() as usize;
        let level = ((value - min_val) * y_scale).round() as usize;
        let y = (plot_height - 1).saturating_sub(level);
        grid[y][x.min(width - 1)] = '*';
    }

    let mut output = format!("{}\nMax: {:.4}\n", title, max_val);
    for row in &grid {
        output.extend(row.iter());
        output.push('\n');
    }
    output.push_str(&format!("Min: {:.4}\nPoints: {}\n", min_val, values.len()));
    output
}

/// One-line progress report for the training loop.
pub fn training_progress(episode: usize, total_episodes: usize, mean_reward: f32, epsilon: Option<f32>) -> String {
    let progress = if total_episodes == 0 { 1.0 } else { episode as f32 / total_episodes as f32 };
    let bar_length = 30;
    let filled = ((progress * bar_length as f32) as usize).min(bar_length);
    let bar = format!("[{}{}]", "=".repeat(filled), " ".repeat(bar_length - filled));

    let mut line = format!(
        "Episode {}/{} {} {:.1}% | Mean reward: {:.2}",
        episode,
        total_episodes,
        bar,
        progress * 100.0,
        mean_reward
    );
    if let Some(eps) = epsilon {
        line.push_str(&format!(" | eps: {:.3}", eps));
    }
    line
}
