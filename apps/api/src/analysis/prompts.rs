// Prompt templates for resume analysis.
// Each template carries exactly one job-field marker; nothing else is dynamic.

use crate::models::analysis::AnalysisKind;

/// Placeholder replaced by the extracted job field.
pub const JOB_FIELD_MARKER: &str = "[JOB_FIELD]";

/// Full review of the resume against the job description.
pub const FULL_ANALYSIS_TEMPLATE: &str = r#"As an experienced Technical Human Resource Manager with expertise in [JOB_FIELD], conduct a comprehensive review of the resume against the job description. Please provide a structured analysis including:

1. Overall Alignment (Scale 1-10)
2. Key Strengths:
   - Technical skills that match perfectly
   - Relevant experience highlights
   - Notable achievements
3. Areas for Development:
   - Missing critical skills
   - Experience gaps
   - Suggested improvements
4. Specific Recommendations:
   - Skills to acquire
   - Certifications to pursue
   - Projects to undertake

Please be specific and provide actionable feedback that will help the candidate improve their profile for this role."#;

/// Skill gap analysis and learning plan.
pub const SKILLS_GAP_TEMPLATE: &str = r#"As an experienced Career Coach specializing in [JOB_FIELD], analyze the resume and job description to provide:

1. Skill Gap Analysis:
   - Critical missing skills
   - Emerging technologies not mentioned
   - Industry-specific knowledge gaps

2. Detailed Learning Path:
   - Recommended online courses
   - Certification priorities
   - Hands-on project suggestions
   - Timeline for skill acquisition

3. Career Development Strategy:
   - Short-term goals (3-6 months)
   - Long-term goals (1-2 years)
   - Industry networking suggestions

Provide specific, actionable recommendations with estimated timelines for implementation."#;

/// ATS-style match score with keyword analysis.
pub const MATCH_SCORE_TEMPLATE: &str = r#"As an advanced ATS scanner with expertise in [JOB_FIELD], provide a detailed analysis including:

1. Overall Match Score:
   - Percentage match with explanation
   - Breakdown by category (skills, experience, education)

2. Keyword Analysis:
   - Present keywords (weighted by importance)
   - Missing critical keywords
   - Context analysis of keyword usage

3. ATS Optimization Recommendations:
   - Format improvements
   - Keyword placement suggestions
   - Content enhancement opportunities

4. Competitive Analysis:
   - Position in candidate pool
   - Stand-out qualifications
   - Critical differentiators needed

Provide specific examples and actionable recommendations for improvement."#;

pub fn template_for(kind: AnalysisKind) -> &'static str {
    match kind {
        AnalysisKind::FullAnalysis => FULL_ANALYSIS_TEMPLATE,
        AnalysisKind::SkillsGap => SKILLS_GAP_TEMPLATE,
        AnalysisKind::MatchScore => MATCH_SCORE_TEMPLATE,
    }
}

/// Renders the template for `kind` with `job_field` in place of the marker.
pub fn render_prompt(kind: AnalysisKind, job_field: &str) -> String {
    template_for(kind).replace(JOB_FIELD_MARKER, job_field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_template_has_exactly_one_marker() {
        for kind in AnalysisKind::ALL {
            assert_eq!(
                template_for(kind).matches(JOB_FIELD_MARKER).count(),
                1,
                "{kind} template must carry one marker"
            );
        }
    }

    #[test]
    fn test_rendered_prompt_has_field_and_no_marker() {
        for kind in AnalysisKind::ALL {
            let prompt = render_prompt(kind, "Machine Learning");
            assert!(
                prompt.contains("in Machine Learning,"),
                "{kind} prompt must name the job field"
            );
            assert!(!prompt.contains(JOB_FIELD_MARKER));
        }
    }

    #[test]
    fn test_field_lands_where_marker_was() {
        let template = template_for(AnalysisKind::SkillsGap);
        let at = template.find(JOB_FIELD_MARKER).unwrap();
        let prompt = render_prompt(AnalysisKind::SkillsGap, "DevOps");
        assert_eq!(&prompt[..at], &template[..at]);
        assert_eq!(&prompt[at..at + "DevOps".len()], "DevOps");
        assert_eq!(
            &prompt[at + "DevOps".len()..],
            &template[at + JOB_FIELD_MARKER.len()..]
        );
    }
}
