use std::fmt::{self, Write as _};

use causal_engine::{
    dataset::{
        churn::{Tier, UserRecord},
        rifle::{Shot, Theory},
    },
    lesson::{
        LessonDetail, LessonView, coarsened_exact_matching,
        confounders::{self, CohortSummary, Instrument, WorkedRatio},
        difference_in_differences::{self, ChartStage},
        randomized_experiments::{self, Bias, Rollout},
        selection_bias::{self, Phase, Site},
        what_is_causality::{self, VerdictOutcome},
    },
    matching::MatchingView,
};
use ratatui::{
    layout::{Constraint, Layout, Spacing},
    prelude::{Buffer, Direction, Rect},
    style::{Color, Style},
    symbols::merge::MergeStrategy,
    text::Line,
    widgets::{Bar, BarChart, Block, List, ListItem, ListState, StatefulWidget, Widget},
};

use super::{Series, SeriesChart, bounds_of, pane_height, render_text_pane, style};

/// Interactive part of a lesson: charts, games and their results.
#[derive(Debug)]
pub struct LessonDetailDisplay<'a> {
    view: &'a LessonView,
    cursor: usize,
}

impl<'a> LessonDetailDisplay<'a> {
    pub fn new(view: &'a LessonView) -> Self {
        Self { view, cursor: 0 }
    }

    /// Highlighted row of the matching pool.
    #[must_use]
    pub fn cursor(self, cursor: usize) -> Self {
        Self { cursor, ..self }
    }
}

impl Widget for LessonDetailDisplay<'_> {
    fn render(self, area: Rect, buf: &mut Buffer)
    where
        Self: Sized,
    {
        match &self.view.detail {
            LessonDetail::WhatIsCausality(detail) => render_rifle_range(detail, area, buf),
            LessonDetail::SelectionBias(detail) => render_city_map(detail, area, buf),
            LessonDetail::Confounders(detail) => render_classrooms(detail, area, buf),
            LessonDetail::RandomizedExperiments(detail) => render_rollouts(detail, area, buf),
            LessonDetail::DifferenceInDifferences(detail) => render_territories(detail, area, buf),
            LessonDetail::CoarsenedExactMatching(detail) => {
                render_churn(detail, self.cursor, area, buf);
            }
        }
    }
}

/// Splits `area` into a text pane sized for `lines` and the rest.
fn split_below_text(lines: &[Line<'_>], area: Rect) -> [Rect; 2] {
    Layout::vertical([Constraint::Length(pane_height(lines)), Constraint::Fill(1)])
        .spacing(Spacing::Overlap(1))
        .areas(area)
}

fn choice_line(key: usize, label: impl fmt::Display, active: bool, done: bool) -> Line<'static> {
    let marker = if active { ">" } else { " " };
    let suffix = if done { " ✓" } else { "" };
    let line_style = match (active, done) {
        (true, _) => style::SELECTED,
        (false, true) => style::DONE,
        (false, false) => Style::default(),
    };
    Line::styled(format!("{marker} {key}. {label}{suffix}"), line_style)
}

/// Bar length for a value shown with one decimal.
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bar_value(value: f64) -> u64 {
    (value.abs() * 10.0).round() as u64
}

fn percent(rate: Option<f64>) -> String {
    rate.map_or_else(|| "n/a".to_owned(), |rate| format!("{:.0}%", rate * 100.0))
}

fn render_rifle_range(detail: &what_is_causality::Detail, area: Rect, buf: &mut Buffer) {
    let mut lines = vec![];
    if detail.unlocked_theories.is_empty() {
        lines.push(Line::styled(
            "Read on to collect theories about the bad mornings.",
            style::HINT,
        ));
    }
    for (i, theory) in Theory::ALL.iter().copied().enumerate() {
        if detail.unlocked_theories.contains(&theory) {
            let active = detail.active_theory == Some(theory);
            lines.push(choice_line(i + 1, theory, active, false));
        }
    }
    if let Some(dial) = &detail.dial {
        lines.push(Line::from(format!(
            "{}: {} {} (range {}-{})",
            dial.dial.label, dial.value, dial.dial.unit, dial.dial.min, dial.dial.max
        )));
    }
    if let Some(verdict) = &detail.verdict {
        let verdict_style = match verdict.outcome {
            VerdictOutcome::Pending => style::PENDING,
            VerdictOutcome::Rejected => style::WRONG,
            VerdictOutcome::Confirmed => style::CORRECT,
        };
        lines.push(Line::styled(verdict.text, verdict_style));
    }
    if detail.mystery_solved {
        lines.push(Line::styled(
            "Mystery solved: the hangover explains the morning misses.",
            style::CORRECT,
        ));
    }

    let Some(targets) = &detail.targets else {
        render_text_pane("Shooting range", lines, area, buf);
        return;
    };
    lines.push(Line::from(format!(
        "Hangover severity: {:.0}%",
        targets.hangover_severity * 100.0
    )));

    let [text_area, chart_area] = split_below_text(&lines, area);
    render_text_pane("Shooting range", lines, text_area, buf);

    let to_points = |shots: &[Shot]| shots.iter().map(|s| (s.x, s.y)).collect::<Vec<_>>();
    let morning = to_points(&targets.morning);
    let afternoon = to_points(&targets.afternoon);
    let bullseye = [(0.0, 0.0)];
    let limit = morning
        .iter()
        .chain(&afternoon)
        .map(|(x, y)| x.abs().max(y.abs()))
        .fold(3.0, f64::max)
        .ceil();
    let bounds = [-limit, limit];

    let [morning_area, afternoon_area] =
        Layout::horizontal([Constraint::Fill(1), Constraint::Fill(1)])
            .spacing(Spacing::Overlap(1))
            .areas(chart_area);
    for (title, points, score, target_area) in [
        ("Morning", &morning, targets.morning_score, morning_area),
        ("Afternoon", &afternoon, targets.afternoon_score, afternoon_area),
    ] {
        SeriesChart {
            title: format!("{title} (avg {score:.1} in from center)"),
            series: vec![
                Series::scatter("bullseye", &bullseye, Color::Red),
                Series::scatter("shots", points, Color::White),
            ],
            x_title: "in",
            x_bounds: bounds,
            y_title: "in",
            y_bounds: bounds,
        }
        .render(target_area, buf);
    }
}

fn render_city_map(detail: &selection_bias::Detail, area: Rect, buf: &mut Buffer) {
    let mut lines = vec![];
    for (i, site) in Site::ALL.iter().copied().enumerate() {
        let active = detail.site == Some(site);
        lines.push(choice_line(i + 1, site, active, detail.tested.contains(&site)));
    }
    let status = match (detail.phase, detail.site, &detail.outcome) {
        (Phase::Select, ..) => "Choose where to put the sign-up sign.".to_owned(),
        (Phase::Placed, Some(site), _) => format!("Sign placed at the {site}."),
        (Phase::Signup, _, Some(outcome)) => {
            format!(
                "{} volunteers signed up and were split into two groups.",
                outcome.signups
            )
        }
        (Phase::Results, Some(site), _) => format!("Results from the {site}."),
        _ => String::new(),
    };
    lines.push(Line::styled(status, style::PENDING));

    let results = detail.outcome.filter(|_| detail.show_results);
    if let Some(outcome) = results {
        lines.push(Line::from(outcome.explanation));
    }
    if detail.all_sites_tested {
        lines.push(Line::styled(
            "Every site attracted a different kind of volunteer, and each result was biased.",
            style::CORRECT,
        ));
    }

    let Some(outcome) = results else {
        render_text_pane("City map", lines, area, buf);
        return;
    };
    let [text_area, chart_area] = split_below_text(&lines, area);
    render_text_pane("City map", lines, text_area, buf);

    let bar = |label: &'static str, change: f64, color: Color| {
        Bar::with_label(label, bar_value(change))
            .text_value(format!("{change:+.1} lb"))
            .style(Style::default().fg(color))
    };
    BarChart::new(vec![
        bar("Runners", outcome.treatment_weight_change, style::TREATED),
        bar("Control", outcome.control_weight_change, style::CONTROL),
    ])
    .block(
        Block::bordered()
            .merge_borders(MergeStrategy::Exact)
            .title("Weight change"),
    )
    .direction(Direction::Horizontal)
    .bar_gap(0)
    .render(chart_area, buf);
}

fn ratio_line(label: &str, ratio: &WorkedRatio) -> Line<'static> {
    let result = ratio
        .points_per_hour
        .map_or_else(|| "undefined".to_owned(), |r| format!("{r:.1}"));
    Line::from(format!(
        "{label}: ({} - {}) / ({} - {}) = {result} points per hour",
        ratio.high_grade, ratio.low_grade, ratio.high_hours, ratio.low_hours
    ))
}

fn cohort_chart<'a>(title: &str, cohort: &'a CohortSummary, color: Color) -> SeriesChart<'a> {
    let correlation = cohort
        .correlation
        .map_or_else(String::new, |r| format!(", r = {r:.2}"));
    let slope = cohort
        .fit
        .map_or_else(String::new, |fit| format!(", {:.1} pts/h", fit.slope));
    let means = cohort
        .hours
        .as_ref()
        .zip(cohort.grades.as_ref())
        .map_or_else(String::new, |(hours, grades)| {
            format!(", avg {:.1} h / {:.0} pts", hours.mean, grades.mean)
        });
    let (x_bounds, y_bounds) = bounds_of(&cohort.points);
    let mut series = vec![Series::scatter("students", &cohort.points, color)];
    if !cohort.trend_line.is_empty() {
        series.push(Series::line("trend", &cohort.trend_line, style::TREND));
    }
    SeriesChart {
        title: format!("{title}{correlation}{slope}{means}"),
        series,
        x_title: "hours",
        x_bounds,
        y_title: "grade",
        y_bounds,
    }
}

fn render_classrooms(detail: &confounders::Detail, area: Rect, buf: &mut Buffer) {
    let mut lines = vec![Line::from("Which of these is a good instrument?")];
    for (i, instrument) in Instrument::ALL.iter().copied().enumerate() {
        let active = detail.instrument == Some(instrument);
        lines.push(choice_line(i + 1, instrument, active, false));
    }
    if let Some(feedback) = &detail.feedback {
        let feedback_style = if feedback.correct {
            style::CORRECT
        } else {
            style::WRONG
        };
        lines.push(Line::styled(feedback.text, feedback_style));
    }
    if let Some(math) = &detail.math {
        lines.push(ratio_line("Naive", &math.naive));
        lines.push(ratio_line("School rule", &math.instrument));
    }

    let charts = [
        detail
            .observational
            .as_ref()
            .map(|cohort| cohort_chart("Observational", cohort, style::CONTROL)),
        detail
            .rule_cohort
            .as_ref()
            .map(|cohort| cohort_chart("School rule cohort", cohort, style::TREATED)),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>();
    if charts.is_empty() {
        render_text_pane("Classrooms", lines, area, buf);
        return;
    }

    let [text_area, chart_area] = split_below_text(&lines, area);
    render_text_pane("Classrooms", lines, text_area, buf);
    let chart_areas = Layout::horizontal(vec![Constraint::Fill(1); charts.len()])
        .spacing(Spacing::Overlap(1))
        .split(chart_area);
    for (chart, chart_area) in charts.into_iter().zip(chart_areas.iter()) {
        chart.render(*chart_area, buf);
    }
}

fn render_rollouts(detail: &randomized_experiments::Detail, area: Rect, buf: &mut Buffer) {
    let current = &detail.current;
    let mut lines = vec![];
    for (i, rollout) in Rollout::CHOICES.iter().copied().enumerate() {
        let active = current.rollout == rollout;
        lines.push(choice_line(i + 1, rollout, active, detail.tried.contains(&rollout)));
    }
    let (bias_label, bias_style) = match current.bias {
        Bias::Unknown => ("bias unknown", style::PENDING),
        Bias::High => ("highly biased", style::WRONG),
        Bias::Partial => ("partially biased", style::WRONG),
        Bias::Unbiased => ("unbiased", style::CORRECT),
    };
    lines.push(Line::styled(
        format!(
            "{}: estimated effect {:+.0} min/day ({bias_label})",
            current.rollout, current.ate
        ),
        bias_style,
    ));
    lines.push(Line::from(current.explanation));
    if detail.show_math {
        lines.push(Line::from(format!(
            "ATE = {} - {} = {:+.0} minutes",
            current.feature, current.no_feature, current.ate
        )));
    }
    if detail.all_tried {
        lines.push(Line::styled(
            "Only the randomized rollout measures the feature itself.",
            style::CORRECT,
        ));
    }

    let [text_area, chart_area] = split_below_text(&lines, area);
    render_text_pane("Rollout strategies", lines, text_area, buf);

    let bar = |label: &'static str, minutes: f64, color: Color| {
        Bar::with_label(label, bar_value(minutes))
            .text_value(format!("{minutes:.0} min"))
            .style(Style::default().fg(color))
    };
    BarChart::new(vec![
        bar("No feature", current.no_feature, style::CONTROL),
        bar("Feature", current.feature, style::TREATED),
    ])
    .block(
        Block::bordered()
            .merge_borders(MergeStrategy::Exact)
            .title("Daily engagement"),
    )
    .direction(Direction::Horizontal)
    .bar_gap(0)
    .render(chart_area, buf);
}

fn render_territories(detail: &difference_in_differences::Detail, area: Rect, buf: &mut Buffer) {
    let Some(stage) = detail.stage else {
        let lines = vec![Line::styled(
            "The retention chart appears once the instructions are done.",
            style::HINT,
        )];
        render_text_pane("Territories", lines, area, buf);
        return;
    };

    let mut lines = vec![];
    for (i, candidate) in ChartStage::ALL.iter().copied().enumerate() {
        lines.push(choice_line(i + 1, candidate, candidate == stage, false));
    }
    let metric = |label: &str, value: Option<f64>| {
        value.map(|v| Line::from(format!("{label}: {v:+.1} points")))
    };
    lines.extend(metric("Territory A change", detail.naive_effect));
    lines.extend(metric("Territory B change", detail.control_change));
    if let Some(did) = detail.difference_in_differences {
        lines.push(Line::styled(
            format!("Difference-in-differences: {did:+.1} points"),
            style::CORRECT,
        ));
    }
    if let (true, Some(a), Some(b), Some(did)) = (
        detail.show_math,
        detail.naive_effect,
        detail.control_change,
        detail.difference_in_differences,
    ) {
        lines.push(Line::from(format!("DiD = {a:+.1} - ({b:+.1}) = {did:+.1}")));
    }

    let [text_area, chart_area] = split_below_text(&lines, area);
    render_text_pane("Territories", lines, text_area, buf);

    let points = detail
        .series
        .iter()
        .map(|series| {
            series
                .points
                .iter()
                .map(|(year, retention)| (f64::from(*year), *retention))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    let (x_bounds, y_bounds) = bounds_of(points.iter().flatten());
    let colors = [style::TREATED, style::CONTROL];
    SeriesChart {
        title: format!("Retention ({stage})"),
        series: detail
            .series
            .iter()
            .zip(&points)
            .zip(colors.iter().cycle())
            .map(|((series, data), color)| Series::line(series.label, data, *color))
            .collect(),
        x_title: "year",
        x_bounds,
        y_title: "retention %",
        y_bounds,
    }
    .render(chart_area, buf);
}

fn user_line(user: &UserRecord, show_buckets: bool) -> String {
    let churned = if user.churned { "churned" } else { "stayed" };
    let mut line = format!(
        "{:<4} {:<7} age {:>2}  ${:>3}k  {churned}",
        user.id,
        user.tier.to_string(),
        user.age,
        user.income / 1000
    );
    if show_buckets {
        let _ = write!(line, "  [{}]", user.buckets());
    }
    line
}

fn render_churn(
    detail: &coarsened_exact_matching::Detail,
    cursor: usize,
    area: Rect,
    buf: &mut Buffer,
) {
    if let Some(matching) = &detail.matching {
        render_matching_game(matching, detail.show_buckets, detail.show_math, cursor, area, buf);
        return;
    }

    let mut lines = vec![];
    if detail.show_issue {
        lines.push(Line::styled(
            "An A/B test would mean withholding premium from paying customers.",
            style::PENDING,
        ));
    }
    for user in &detail.users {
        lines.push(Line::from(user_line(user, detail.show_buckets)));
    }
    if let Some(naive) = &detail.naive {
        lines.push(Line::from(format!(
            "Premium churn {} vs free churn {}",
            percent(naive.premium_churn),
            percent(naive.free_churn)
        )));
        if let Some(effect) = naive.effect {
            lines.push(Line::styled(
                format!(
                    "Naive estimate: premium lowers churn by {:.0} points",
                    effect * 100.0
                ),
                style::WRONG,
            ));
        }
    }
    render_text_pane("Subscribers", lines, area, buf);
}

fn render_matching_game(
    matching: &MatchingView,
    show_buckets: bool,
    show_math: bool,
    cursor: usize,
    area: Rect,
    buf: &mut Buffer,
) {
    let [pool_area, result_area] =
        Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)])
            .spacing(Spacing::Overlap(1))
            .areas(area);

    let selected = |id: &str| {
        matching.selected_treatment.as_deref() == Some(id)
            || matching.selected_control.as_deref() == Some(id)
    };
    let items = matching
        .pool
        .iter()
        .map(|entry| {
            let item_style = if entry.matched {
                style::DONE
            } else if selected(&entry.user.id) {
                style::PENDING
            } else if entry.user.tier == Tier::Premium {
                Style::default().fg(style::TREATED)
            } else {
                Style::default().fg(style::CONTROL)
            };
            ListItem::new(user_line(&entry.user, show_buckets)).style(item_style)
        })
        .collect::<Vec<_>>();
    let list = List::new(items)
        .block(
            Block::bordered()
                .merge_borders(MergeStrategy::Exact)
                .title("Users"),
        )
        .highlight_style(style::SELECTED)
        .highlight_symbol(">> ");
    let mut state =
        ListState::default().with_selected((!matching.pool.is_empty()).then_some(cursor));
    StatefulWidget::render(list, pool_area, buf, &mut state);

    let id_or_dash = |id: Option<&str>| id.unwrap_or("-").to_owned();
    let mut lines = vec![Line::from(format!(
        "Premium: {}  Free: {}",
        id_or_dash(matching.selected_treatment.as_deref()),
        id_or_dash(matching.selected_control.as_deref())
    ))];
    if let Some(evaluation) = &matching.evaluation {
        if evaluation.perfect_match {
            lines.push(Line::styled(
                format!("Perfect match: both {}", evaluation.treatment_buckets),
                style::CORRECT,
            ));
        } else {
            let differences = evaluation
                .mismatches
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" and ");
            lines.push(Line::styled(
                format!("Buckets differ on {differences}"),
                style::WRONG,
            ));
        }
    }

    let premium_users = matching
        .pool
        .iter()
        .filter(|entry| entry.user.tier == Tier::Premium)
        .count();
    lines.push(Line::styled(
        format!(
            "Matched {} of {premium_users} premium users",
            matching.matches.len()
        ),
        style::HEADING,
    ));
    for m in &matching.matches {
        lines.push(Line::from(format!(
            "{} ↔ {} ({})",
            m.treatment.id, m.control.id, m.buckets
        )));
    }

    let points = |effect: Option<f64>| {
        effect.map_or_else(|| "n/a".to_owned(), |e| format!("{:+.0} points", e * 100.0))
    };
    lines.push(Line::from(format!(
        "Naive effect: {}",
        points(matching.naive_effect)
    )));
    lines.push(Line::from(format!(
        "Matched effect: {}",
        points(matching.adjusted_effect)
    )));
    if matching.complete {
        lines.push(Line::styled(
            format!(
                "Stratified effect: {}",
                points(matching.stratified_effect)
            ),
            style::CORRECT,
        ));
    }
    if show_math {
        lines.push(Line::from(
            "Matched effect = mean free churn - mean premium churn, over matched pairs",
        ));
    }
    render_text_pane("Matching", lines, result_area, buf);
}

#[cfg(test)]
mod tests {
    use causal_engine::{action::Action, course::Course, lesson::LessonId};

    use super::*;

    fn render(view: &LessonView) -> Buffer {
        let area = Rect::new(0, 0, 100, 40);
        let mut buf = Buffer::empty(area);
        LessonDetailDisplay::new(view).render(area, &mut buf);
        buf
    }

    fn buffer_text(buf: &Buffer) -> String {
        buf.content().iter().map(|cell| cell.symbol()).collect()
    }

    /// Views of `lesson` from step 1 up to the first step that blocks.
    fn reachable_views(course: &mut Course, lesson: LessonId) -> Vec<LessonView> {
        course.enter(lesson);
        let mut views = vec![];
        loop {
            let view = course.lesson(lesson).unwrap().view();
            let can_advance = view.can_advance;
            views.push(view);
            if !can_advance {
                return views;
            }
            course.dispatch(&Action::Advance).unwrap();
        }
    }

    #[test]
    fn test_every_reachable_step_renders() {
        let mut course = Course::new();
        for lesson in LessonId::ALL {
            for view in reachable_views(&mut course, lesson) {
                let text = buffer_text(&render(&view));
                assert!(
                    text.contains("Shooting range")
                        || text.contains("City map")
                        || text.contains("Classrooms")
                        || text.contains("Rollout strategies")
                        || text.contains("Territories")
                        || text.contains("Subscribers")
                        || text.contains("Users"),
                    "{lesson} step {} rendered no pane",
                    view.step
                );
            }
        }
    }

    #[test]
    fn test_matching_pool_lists_users() {
        let mut course = Course::new();
        let views = reachable_views(&mut course, LessonId::CoarsenedExactMatching);
        let game = views.last().unwrap();
        assert_eq!(game.step, 9);
        let text = buffer_text(&render(game));
        assert!(text.contains("P1"));
        assert!(text.contains("Matched 0 of"));
    }

    #[test]
    fn test_user_line_shows_buckets_on_request() {
        let user = &causal_engine::dataset::churn::matching_subset()[0];
        assert!(!user_line(user, false).contains('['));
        assert!(user_line(user, true).contains(&user.buckets().to_string()));
    }

    #[test]
    fn test_cohort_chart_title_shows_averages() {
        let mut course = Course::new();
        let views = reachable_views(&mut course, LessonId::Confounders);
        let LessonDetail::Confounders(detail) = &views[1].detail else {
            unreachable!();
        };
        let cohort = detail.observational.as_ref().unwrap();
        let chart = cohort_chart("Observational", cohort, style::CONTROL);
        assert!(chart.title.starts_with("Observational, r = "));
        assert!(chart.title.contains(" h / "), "{}", chart.title);
    }

    #[test]
    fn test_bar_value_keeps_one_decimal() {
        assert_eq!(bar_value(2.0), 20);
        assert_eq!(bar_value(-0.25), 3);
    }
}
