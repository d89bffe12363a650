use urlencoding::encode;

/// Stack name from a stack id such as
/// `arn:aws:cloudformation:eu-west-1:111122223333:stack/my-stack/0f1e...`.
/// Falls back to the full id when it has no `/`-separated name segment.
pub fn stack_name_from_id(stack_id: &str) -> &str {
    stack_id
        .split('/')
        .nth(1)
        .filter(|name| !name.is_empty())
        .unwrap_or(stack_id)
}

/// Region segment of an ARN such as a stack id, `None` when it has none.
pub fn region_from_arn(arn: &str) -> Option<&str> {
    match arn.split(':').collect::<Vec<_>>().as_slice() {
        ["arn", _partition, _service, region, ..] if !region.is_empty() => Some(*region),
        _ => None,
    }
}

fn console_base_url(region: &str) -> String {
    format!("https://{}.console.aws.amazon.com/", region)
}

pub fn stack_console_link(region: &str, stack_id: &str) -> String {
    format!(
        "{}cloudformation/home?region={}&stackId={}",
        console_base_url(region),
        region,
        encode(stack_id)
    )
}

pub fn template_designer_link(region: &str, stack_id: &str) -> String {
    format!(
        "{}cloudformation/designer/home?region={}&stackId={}",
        console_base_url(region),
        region,
        encode(stack_id)
    )
}

/// Console link for the resource types we know how to address, `None` otherwise.
pub fn resource_console_link(
    resource_type: &str,
    region: &str,
    physical_id: &str,
) -> Option<String> {
    let encoded_id = encode(physical_id);
    let base_url = console_base_url(region);

    match resource_type {
        "AWS::Events::Rule" => Some(format!(
            "{}events/home?region={}#/rules/{}",
            base_url, region, encoded_id
        )),
        "AWS::Lambda::Function" => Some(format!(
            "{}lambda/home?region={}#functions/{}",
            base_url, region, encoded_id
        )),
        "AWS::DynamoDB::Table" => Some(format!(
            "{}dynamodb/home?region={}#tables:selected={}",
            base_url, region, encoded_id
        )),
        _ => None,
    }
}
