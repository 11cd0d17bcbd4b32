// All LLM prompt templates for the projection pipeline.
// Placeholders are `{name}` tokens replaced by projection::builder.

/// Explanation prompt.
/// Replace: {institution}, {field}, {zipcode}, {occupation}, {area}, {bedrooms},
///          {plain_numbers_instruction}
pub const EXPLANATION_PROMPT_TEMPLATE: &str = r#"Provide a detailed financial projection with these exact sections:

1. EDUCATION COSTS
- Institution: {institution}
- Program: {field}
- Residency Status: [determine if {zipcode} is in-state or out-of-state for {institution}]
- Annual tuition: [exact number]
- Living costs during school: [exact number]
- Total 4-year cost: [exact number]

2. FINANCIAL AID
- Zipcode {zipcode} median household income: [exact number]
- Expected grants: [exact number]
- Loan amount needed: [exact number]
- Monthly loan payment: [exact number]

3. CAREER PROJECTION
- Position: {occupation}
- Location: {area}
- Starting salary: [exact number]
- Expected annual raises: [percentage]
- Housing ({bedrooms} bedroom) monthly cost: [exact number]

4. YEARLY BREAKDOWN
Year 1-4 (School):
- Annual expenses: [exact number]
- Loan accumulation: [exact number]
- Net worth change: [exact number]

Years 5-15 (Career):
- Annual income: [exact number]
- Annual expenses: [exact number]
- Loan payments: [exact number]
- Savings rate: [exact number]
- Net worth change: [exact number]

{plain_numbers_instruction}"#;

/// Chart prompt. Replace: {numbers_instruction}, {explanation}, {json_only_instruction}
pub const CHART_PROMPT_TEMPLATE: &str = r#"Generate a financial projection as valid JSON with exactly this structure:
{
    "data": {
        "years": [1,2,3,4,5,6,7,8,9,10,11,12,13,14,15],
        "netWorth": [list of 15 numbers],
        "income": [list of 15 numbers],
        "expenses": [list of 15 numbers],
        "loans": [list of 15 numbers]
    },
    "summary": {
        "totalNetWorth": number,
        "peakNetWorth": number,
        "averageGrowth": number
    }
}

Rules:
- {numbers_instruction}
- First 4 years should show school expenses and loan accumulation
- Years 5-15 should show career income and expenses
- Use the following data for calculations:
{explanation}

{json_only_instruction}"#;

/// Plan prompt. Replace: {explanation}, {chart}, {format_instruction}
pub const PLAN_PROMPT_TEMPLATE: &str = r#"Based on the explanation and the JSON chart below, provide 3 alternative plans for the user:
alternative college, field of study, career, and location recommended. Provide them in concise text.
{format_instruction}
Explanation:
{explanation}

JSON Chart:
{chart}"#;

/// Revision prompt (chart schema + impact).
/// Replace: {preferences}, {explanation}, {json_only_instruction}
pub const REVISION_PROMPT_TEMPLATE: &str = r#"Considering these personal preferences or interests:
{preferences}

Generate a financial projection as valid JSON with exactly this structure:
{
    "data": {
        "years": [1,2,3,4,5,6,7,8,9,10,11,12,13,14,15],
        "netWorth": [list of 15 numbers showing significant changes based on preferences],
        "income": [list of 15 numbers showing significant changes based on preferences],
        "expenses": [list of 15 numbers showing significant changes based on preferences],
        "loans": [list of 15 numbers showing significant changes based on preferences]
    },
    "summary": {
        "totalNetWorth": number,
        "peakNetWorth": number
    },
    "impact": {
        "changes": [list of specific changes based on preferences],
        "financialEffect": [list of financial impacts, one per change]
    }
}

Based on the original projection, ensure that the changes reflected are meaningful and align with the preferences.
Additionally, compare these changes to ensure they differ from the previous projections below:
{explanation}

{json_only_instruction}"#;

/// Sectioned revision prompt (revisedExplanation + comparison).
/// Replace: {preferences}, {explanation}, {json_only_instruction}
pub const SECTIONED_REVISION_PROMPT_TEMPLATE: &str = r#"Considering the following personal preferences or interests:
{preferences}

Revise the 15-year net worth projection based on this new information.
Return valid JSON with exactly two top-level keys, "revisedExplanation" and "comparison":
{
    "revisedExplanation": {
        "1. EDUCATION COSTS": {...},
        "2. FINANCIAL AID": {...},
        "3. CAREER PROJECTION": {...},
        "4. YEARLY BREAKDOWN": {
            "netWorthProgression": [list of 15 numbers],
            "incomeProgression": [list of 15 numbers],
            "expenseProgression": [list of 15 numbers],
            "totalNetWorth": number,
            "peakNetWorth": number,
            "averageGrowth": number
        }
    },
    "comparison": {
        "mainChanges": [list of strings],
        "financialImpact": [list of strings]
    }
}

Original Explanation:
{explanation}

{json_only_instruction}"#;

/// Transition prompt.
/// Replace: {original_years}, {transition_year}, {original_*}, {new_*},
///          {original_chart}, {json_only_instruction}
pub const TRANSITION_PROMPT_TEMPLATE: &str = r#"Generate a financial projection showing impact of career/education change.
Make sure the new path shows the negative or positive impact on the net worth and other financial metrics.

Original Path ({original_years}):
- Institution: {original_institution}
- Field: {original_field}
- Location: {original_area}
- Occupation: {original_occupation}

New Path (Years {transition_year}-15):
- Institution: {new_institution}
- Field: {new_field}
- Location: {new_area}
- Occupation: {new_occupation}

Keep every year before year {transition_year} identical to the original projection below:
{original_chart}

Return valid JSON with structure:
{
    "data": {
        "years": [1,2,3,4,5,6,7,8,9,10,11,12,13,14,15],
        "netWorth": [15 numbers],
        "income": [15 numbers],
        "expenses": [15 numbers],
        "loans": [15 numbers]
    },
    "summary": {
        "totalNetWorth": number,
        "peakNetWorth": number,
        "averageGrowth": number,
        "transitionCost": number
    },
    "impact": {
        "changes": [strings],
        "financialEffect": [strings]
    }
}

{json_only_instruction}"#;
