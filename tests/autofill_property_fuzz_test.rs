use form_autofill::{FillStatus, Page, Profile};
use proptest::collection::vec;
use proptest::option;
use proptest::prelude::*;
use proptest::test_runner::{FileFailurePersistence, TestCaseError, TestCaseResult};

const AUTOFILL_PROPTEST_REGRESSION_FILE: &str =
    "tests/proptest-regressions/autofill_property_fuzz_test.txt";
const DEFAULT_AUTOFILL_PROPTEST_CASES: u32 = 128;

#[derive(Clone, Debug)]
struct FieldFixture {
    tag: &'static str,
    input_type: &'static str,
    label_attr: &'static str,
    label: &'static str,
    hidden_style: Option<&'static str>,
    initial: String,
    options: Vec<String>,
}

fn autofill_proptest_cases() -> u32 {
    std::env::var("FORM_AUTOFILL_PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_AUTOFILL_PROPTEST_CASES)
}

fn text_strategy() -> BoxedStrategy<String> {
    vec(
        prop_oneof![
            Just('a'),
            Just('j'),
            Just('x'),
            Just('0'),
            Just('5'),
            Just(' '),
            Just('-'),
            Just('@'),
            Just('.'),
        ],
        0..=8,
    )
    .prop_map(|chars| chars.into_iter().collect())
    .boxed()
}

fn option_values_strategy() -> BoxedStrategy<Vec<String>> {
    vec(
        prop_oneof![
            Just(String::new()),
            Just("a".to_string()),
            Just("j".to_string()),
            text_strategy(),
        ],
        0..=4,
    )
    .boxed()
}

fn field_strategy() -> BoxedStrategy<FieldFixture> {
    (
        prop_oneof![
            3 => Just("input"),
            1 => Just("textarea"),
            1 => Just("select"),
        ],
        prop_oneof![
            4 => Just("text"),
            1 => Just("email"),
            1 => Just("tel"),
            1 => Just("hidden"),
            1 => Just("file"),
        ],
        prop_oneof![
            Just("name"),
            Just("id"),
            Just("placeholder"),
            Just("autocomplete"),
            Just("class"),
            Just("aria-label"),
            Just("data-testid"),
        ],
        prop_oneof![
            Just("email"),
            Just("Phone"),
            Just("full_name"),
            Just("First Name"),
            Just("lname"),
            Just("name"),
            Just("username"),
            Just("company-name"),
            Just("skills"),
            Just("cover letter"),
            Just("zip"),
        ],
        option::weighted(
            0.2,
            prop_oneof![
                Just("display:none"),
                Just("visibility: hidden"),
                Just("color: red"),
            ],
        ),
        text_strategy(),
        option_values_strategy(),
    )
        .prop_map(
            |(tag, input_type, label_attr, label, hidden_style, initial, options)| FieldFixture {
                tag,
                input_type,
                label_attr,
                label,
                hidden_style,
                initial,
                options,
            },
        )
        .boxed()
}

fn profile_strategy() -> BoxedStrategy<Profile> {
    (
        option::of(text_strategy()),
        option::of(text_strategy()),
        option::of(text_strategy()),
        option::of(text_strategy()),
        option::of(text_strategy()),
    )
        .prop_map(|(full_name, email, phone, skills, experience)| Profile {
            full_name,
            email,
            phone,
            skills,
            experience,
        })
        .boxed()
}

fn render_fixture(fields: &[FieldFixture]) -> String {
    let mut html = String::from("<form>");
    for field in fields {
        let style = field
            .hidden_style
            .map(|style| format!(" style='{style}'"))
            .unwrap_or_default();
        match field.tag {
            "textarea" => html.push_str(&format!(
                "<textarea {}='{}'{}>{}</textarea>",
                field.label_attr, field.label, style, field.initial
            )),
            "select" => {
                html.push_str(&format!(
                    "<select {}='{}'{}>",
                    field.label_attr, field.label, style
                ));
                for option in &field.options {
                    html.push_str(&format!("<option value='{option}'>{option}</option>"));
                }
                html.push_str("</select>");
            }
            _ => html.push_str(&format!(
                "<input type='{}' {}='{}'{} value='{}'>",
                field.input_type, field.label_attr, field.label, style, field.initial
            )),
        }
    }
    html.push_str("</form>");
    html
}

fn fail(err: form_autofill::Error) -> TestCaseError {
    TestCaseError::fail(format!("{err:?}"))
}

fn assert_fill_pass_is_bounded_and_idempotent(
    fields: &[FieldFixture],
    profile: &Profile,
) -> TestCaseResult {
    let html = render_fixture(fields);
    let mut page = Page::from_html(&html).map_err(fail)?;
    let candidates = page.candidate_fields().map_err(fail)?.count();

    let first = page.autofill(profile).map_err(fail)?;
    prop_assert!(
        first.filled_count <= first.matched_count,
        "filled exceeds matched: {first:?}, html={html}"
    );
    prop_assert!(
        first.matched_count <= candidates,
        "matched exceeds candidates ({candidates}): {first:?}, html={html}"
    );

    let second = page.autofill(profile).map_err(fail)?;
    prop_assert_eq!(second.filled_count, 0, "second pass wrote again, html={}", html);
    prop_assert_eq!(second.matched_count, first.matched_count);
    if second.matched_count > 0 {
        prop_assert_eq!(second.status(), FillStatus::AlreadyFilled);
    } else {
        prop_assert_eq!(second.status(), FillStatus::NoFields);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: autofill_proptest_cases(),
        failure_persistence: Some(Box::new(
            FileFailurePersistence::Direct(AUTOFILL_PROPTEST_REGRESSION_FILE),
        )),
        .. ProptestConfig::default()
    })]

    #[test]
    fn autofill_counts_are_bounded_and_repeat_passes_are_idempotent(
        fields in vec(field_strategy(), 0..=12),
        profile in profile_strategy(),
    ) {
        assert_fill_pass_is_bounded_and_idempotent(&fields, &profile)?;
    }
}
