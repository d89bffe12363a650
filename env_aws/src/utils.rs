pub async fn get_aws_config(region: Option<&str>) -> aws_config::SdkConfig {
    let mut loader = aws_config::from_env();
    if let Some(r) = region {
        loader = loader.region(aws_config::Region::new(r.to_string()));
    }
    loader.load().await
}

pub async fn dynamodb_client(region: Option<&str>) -> aws_sdk_dynamodb::Client {
    aws_sdk_dynamodb::Client::new(&get_aws_config(region).await)
}

pub async fn sns_client(region: Option<&str>) -> aws_sdk_sns::Client {
    aws_sdk_sns::Client::new(&get_aws_config(region).await)
}
