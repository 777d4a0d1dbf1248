//! Terminal rendering for outlines and module detail.

use courseforge_core::model::{CourseOutline, ModuleDetail, TeachingSection};

/// Print the outline as a numbered module table.
pub fn render_outline(outline: &CourseOutline) {
    println!();
    println!("Course: {}", outline.course_title);
    println!(
        "Grade: {}  Subject: {}  Estimated: {} h",
        outline.grade, outline.subject, outline.estimated_hours
    );
    println!();
    println!("{:<4} {:<8} {:<40} {:>8}", "#", "ID", "TITLE", "MINUTES");
    println!("{}", "-".repeat(64));
    for module in &outline.modules {
        let title = if module.title.len() > 38 {
            format!("{}...", &module.title[..35])
        } else {
            module.title.clone()
        };
        println!(
            "{:<4} {:<8} {:<40} {:>8}",
            module.sequence, module.module_id, title, module.duration_minutes
        );
    }
    println!();
}

fn render_section(label: &str, section: &TeachingSection) {
    println!("[{label}] {} ({} min)", section.title, section.duration_minutes);
    println!("  {}", section.content);
    for activity in &section.activities {
        println!("  - {activity}");
    }
    println!();
}

/// Print the full teaching detail for one module.
pub fn render_detail(detail: &ModuleDetail) {
    println!();
    println!("Module {} teaching plan", detail.module_id);
    println!("{}", "=".repeat(64));
    render_section("intro", &detail.teaching_plan.introduction);
    render_section("main", &detail.teaching_plan.main_content);
    render_section("practice", &detail.teaching_plan.practice);
    render_section("summary", &detail.teaching_plan.summary);

    if !detail.examples.is_empty() {
        println!("Examples:");
        for example in &detail.examples {
            println!("  {} -- {}", example.title, example.purpose);
            println!("    {}", example.content);
        }
        println!();
    }

    if !detail.exercises.is_empty() {
        println!("Exercises:");
        for exercise in &detail.exercises {
            println!(
                "  [{}] ({}, {}) {}",
                exercise.id, exercise.kind, exercise.difficulty, exercise.question
            );
            println!("    Answer: {}", exercise.answer);
        }
        println!();
    }

    if !detail.teaching_tips.is_empty() {
        println!("Teaching tips:");
        for tip in &detail.teaching_tips {
            println!("  - {tip}");
        }
        println!();
    }
}
