//! `hearth level <xp>`: inspect the configured curve.

use std::io::Write;

use anyhow::{Context, Result};
use hearth_core::config::HearthConfig;
use hearth_core::leveling::{LevelCurve, UserProgress};

/// Prints the progress an XP total maps to under the configured curve.
pub fn run(config: &HearthConfig, xp: u64, out: &mut impl Write) -> Result<()> {
    let curve = LevelCurve::from_config(&config.leveling).context("invalid [leveling] config")?;
    let user = UserProgress::from_xp(&curve, xp);
    let progress = &user.progress;

    writeln!(out, "xp:        {}", user.experience_points)?;
    writeln!(out, "level:     {}", progress.level)?;
    writeln!(
        out,
        "progress:  {} / {} ({:.1}%)",
        progress.xp_into_level,
        progress.xp_for_next_level,
        progress.fraction * 100.0
    )?;
    writeln!(
        out,
        "next at:   {}",
        progress
            .current_level_xp
            .saturating_add(progress.xp_for_next_level)
    )?;
    writeln!(out, "title:     {}", user.title.unwrap_or("-"))?;
    writeln!(out, "color:     {}", user.color)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use hearth_core::config::CurveKind;

    use super::*;

    fn render(config: &HearthConfig, xp: u64) -> String {
        let mut out = Vec::new();
        run(config, xp, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_default_curve_output() {
        // Quadratic, base 100: level 3 starts at 500 and costs 900.
        let text = render(&HearthConfig::default(), 650);

        assert!(text.contains("level:     3\n"), "{text}");
        assert!(text.contains("progress:  150 / 900 (16.7%)\n"), "{text}");
        assert!(text.contains("next at:   1400\n"), "{text}");
        assert!(text.contains("title:     -\n"), "{text}");
    }

    #[test]
    fn test_titled_level_output() {
        let mut config = HearthConfig::default();
        config.leveling.curve = CurveKind::Linear;

        let text = render(&config, 1_000);

        assert!(text.contains("level:     5\n"), "{text}");
        assert!(text.contains("title:     Regular\n"), "{text}");
        assert!(text.contains("color:     #22c55e\n"), "{text}");
    }

    #[test]
    fn test_invalid_curve_is_rejected() {
        let mut config = HearthConfig::default();
        config.leveling.base_xp = 0;

        let err = run(&config, 10, &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("[leveling]"));
    }
}
