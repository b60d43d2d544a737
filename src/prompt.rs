use crate::models::PlanningRequest;

/// Builds the completion prompt. The requested layout is what `plan::parse_plan` reads back.
pub fn build_prompt(request: &PlanningRequest, plan_days: u8) -> String {
    format!(
        "Create a detailed {days}-day study plan in structured format for the goal: {goal}. \
         The user is available {hours} hours per day between {start} and {end}. \
         For each day write exactly these lines and nothing else:\n\
         Day <number>: <weekday>\n\
         Topics: <topics to study>\n\
         Time Allotted: <HH:MM-HH:MM>[;<HH:MM-HH:MM>...]\n\
         Number the days from 1 to {days}. Use 24-hour times inside the available window \
         and separate multiple sessions with a semicolon.",
        days = plan_days,
        goal = request.goal.trim(),
        hours = request.hours_per_day.trim(),
        start = request.time_slot.start.trim(),
        end = request.time_slot.end.trim(),
    )
}
