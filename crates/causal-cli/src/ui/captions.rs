//! Headings and short texts for lesson sections.

use causal_engine::lesson::{LessonId, SectionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caption {
    pub heading: &'static str,
    pub text: &'static str,
}

const fn caption(heading: &'static str, text: &'static str) -> Caption {
    Caption { heading, text }
}

/// Caption of a section; unknown sections get their id as heading.
#[must_use]
pub fn for_section(lesson: LessonId, section: SectionId) -> Caption {
    let known = match lesson {
        LessonId::WhatIsCausality => what_is_causality(section),
        LessonId::SelectionBias => selection_bias(section),
        LessonId::Confounders => confounders(section),
        LessonId::RandomizedExperiments => randomized_experiments(section),
        LessonId::DifferenceInDifferences => difference_in_differences(section),
        LessonId::CoarsenedExactMatching => coarsened_exact_matching(section),
    };
    known.unwrap_or(Caption {
        heading: section,
        text: "",
    })
}

fn what_is_causality(section: SectionId) -> Option<Caption> {
    Some(match section {
        "intro" => caption(
            "The rifle mystery",
            "A marksman tests rifles at the factory. His morning targets are a mess, \
             his afternoon targets are tight. Are the morning rifles faulty?",
        ),
        "pattern" => caption(
            "The pattern",
            "Morning rifles look bad, afternoon rifles look fine. Time of day and \
             accuracy move together, but that alone does not say why.",
        ),
        "questions" => caption(
            "The questions",
            "Is the time of day causing the misses, or is something else happening \
             in the mornings?",
        ),
        "theories" => caption(
            "Test your theories",
            "Each theory comes with a dial. Turn it and watch the morning target. \
             A real cause changes the result; a red herring does not.",
        ),
        "targets" => caption(
            "Target results",
            "Pick a theory with 1-4 and turn its dial with +/-.",
        ),
        "big_lesson" => caption(
            "The big lesson",
            "Mornings were only correlated with bad shooting. The hangover caused it: \
             zero pints gives accurate shots at any time of day.",
        ),
        _ => return None,
    })
}

fn selection_bias(section: SectionId) -> Option<Caption> {
    Some(match section {
        "intro" => caption(
            "The running experiment",
            "You want to know whether a running program helps people lose weight.",
        ),
        "challenge" => caption(
            "The challenge",
            "Recruit volunteers with a sign somewhere in town, split them into a \
             running group and a control group, and compare the weight change.",
        ),
        "city_map" => caption(
            "Choose your sign location",
            "Place the sign with 1-3, then press Enter to wait for sign-ups, run the \
             experiment and try another site.",
        ),
        "explanation" => caption(
            "Selection bias",
            "Every site attracted a special crowd: fast-food fans, people who were \
             already fit, patients who could not run. None of them represent average \
             people, so none of the results generalise.",
        ),
        _ => return None,
    })
}

fn confounders(section: SectionId) -> Option<Caption> {
    Some(match section {
        "core_question" => caption(
            "Do more classroom hours cause better grades?",
            "Students who spend more time in class get better grades. Is the time \
             itself doing the work?",
        ),
        "classroom_example" => caption(
            "The classroom data",
            "Each dot is a student. More hours, higher grades.",
        ),
        "full_story" => caption(
            "The full story",
            "Motivation, teacher quality and family support raise both hours and \
             grades. They are confounders.",
        ),
        "instrument" => caption(
            "Instrumental variables",
            "An instrument changes the cause without touching the outcome directly, \
             and is unrelated to the confounders.",
        ),
        "pick_instrument" => caption(
            "Pick the instrument",
            "Which of these could be an instrument? Choose with 1-3.",
        ),
        "before_after" => caption(
            "Before and after the rule",
            "A new school rule forces extra class hours on every student.",
        ),
        "instrument_hint" => caption(
            "Why the rule works",
            "The rule does not care how motivated a student is, so the extra hours \
             it forces are free of confounding.",
        ),
        "visual_comparison" => caption(
            "Comparing the cohorts",
            "The trend lines of both cohorts, side by side.",
        ),
        "scatter_explanation" => caption(
            "Reading the charts",
            "The observational slope mixes the effect of hours with everything that \
             drives them. Only the change caused by the rule isolates the effect of \
             an extra hour. Press m for the math.",
        ),
        _ => return None,
    })
}

fn randomized_experiments(section: SectionId) -> Option<Caption> {
    Some(match section {
        "scenario" => caption(
            "Does the new feature boost engagement?",
            "Users with the feature spend 25 more minutes a day in the app.",
        ),
        "instructions" => caption(
            "Roll it out",
            "Try each rollout strategy with 1-3 and watch the estimated effect.",
        ),
        "rollout_game" => caption(
            "Rollout strategies",
            "Power users, self-selection and random assignment.",
        ),
        "takeaways" => caption(
            "Key takeaways",
            "Only random assignment makes the groups comparable, so only the \
             randomized rollout measures the feature's effect: 10 minutes, not 25 or 40.",
        ),
        _ => return None,
    })
}

fn difference_in_differences(section: SectionId) -> Option<Caption> {
    Some(match section {
        "recap" => caption(
            "Recap",
            "Randomization is the gold standard, but sometimes you cannot randomize.",
        ),
        "motivation" => caption(
            "When randomization is not possible",
            "A law forces the feature on territory A first; territory B gets it two \
             years later.",
        ),
        "scenario" => caption(
            "Two territories",
            "Retention is tracked yearly in both territories.",
        ),
        "instructions" => caption(
            "How to read the chart",
            "Step through the stages with 1-4.",
        ),
        "interactive" => caption(
            "The staggered rollout",
            "Parallel trends, the spike, the shared trend, and the difference of the \
             differences.",
        ),
        "takeaways" => caption(
            "Key takeaways",
            "Territory A rose 15 points, but territory B rose 10 without the feature. \
             The feature is worth 5 points. Press m for the math.",
        ),
        _ => return None,
    })
}

fn coarsened_exact_matching(section: SectionId) -> Option<Caption> {
    Some(match section {
        "intro" => caption(
            "Does premium reduce churn?",
            "Premium users leave less often than free users.",
        ),
        "scenario" => caption(
            "The scenario",
            "You want to know whether the premium tier itself keeps users around.",
        ),
        "ab_test_problem" => caption(
            "Why not an A/B test?",
            "You cannot hand out premium at random to paying customers. Press i to \
             see the issue.",
        ),
        "alternative" => caption(
            "The alternative",
            "Compare premium users with free users who look just like them.",
        ),
        "meet_users" => caption(
            "Meet the users",
            "Ten premium and fifteen free users with age, income and churn.",
        ),
        "naive_analysis" => caption(
            "The naive analysis",
            "Compare churn rates directly. Press v to show them.",
        ),
        "hidden_pattern" => caption(
            "The hidden pattern",
            "Premium users are older and richer, and older, richer users churn less \
             anyway.",
        ),
        "coarsening" => caption(
            "Coarsening",
            "Group age into Young/Middle-aged/Older and income into Low/Medium/High. \
             Press b to show the buckets.",
        ),
        "matching_game" => caption(
            "The matching game",
            "Move with up/down, pick a user with Tab, confirm a pair with Enter. A \
             pair must share both buckets.",
        ),
        "final_results" => caption(
            "Final results",
            "Within matched pairs, premium and free users churn at the same rate.",
        ),
        "takeaways" => caption(
            "Key takeaways",
            "The naive 20-point gap came from age and income, not from premium. \
             Press m for the math.",
        ),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_visible_section_has_a_caption() {
        for id in LessonId::ALL {
            let lesson = id.create();
            let terminal = lesson.progress().terminal();
            for section in lesson.visible_sections(terminal) {
                assert!(
                    !for_section(id, section).text.is_empty(),
                    "{id}/{section} has no caption"
                );
            }
        }
    }
}
