// @generated
// Generated from: proto/deploy_agent.proto
// Manual check-in for offline builds.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeployDockerComposeRequest {
    #[prost(string, tag = "1")]
    pub service_name: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "2")]
    pub docker_compose_yaml: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub env_file: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeployDockerComposeResponse {
    #[prost(string, tag = "1")]
    pub message: ::prost::alloc::string::String,
    #[prost(float, tag = "2")]
    pub time_taken: f32,
}

pub mod deploy_docker_compose_client {
    #![allow(clippy::derive_partial_eq_without_eq)]
    use tonic::codegen::*;

    #[derive(Debug, Clone)]
    pub struct DeployDockerComposeClient<T> {
        inner: tonic::client::Grpc<T>,
    }

    impl DeployDockerComposeClient<tonic::transport::Channel> {
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }

    impl<T> DeployDockerComposeClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::ResponseBody: Body + Send + 'static,
        T::Error: Into<StdError>,
        <T::ResponseBody as Body>::Error: Into<StdError> + Send,
        <T::ResponseBody as Body>::Data: Into<Bytes> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }

        pub async fn deploy(
            &mut self,
            request: impl tonic::IntoRequest<super::DeployDockerComposeRequest>,
        ) -> Result<tonic::Response<super::DeployDockerComposeResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = tonic::codegen::http::uri::PathAndQuery::from_static(
                "/deployAgent.DeployDockerCompose/Deploy",
            );
            self.inner.unary(request.into_request(), path, codec).await
        }
    }
}

pub mod deploy_docker_compose_server {
    #![allow(clippy::derive_partial_eq_without_eq)]
    use tonic::codegen::*;

    #[tonic::async_trait]
    pub trait DeployDockerCompose: Send + Sync + 'static {
        async fn deploy(
            &self,
            request: tonic::Request<super::DeployDockerComposeRequest>,
        ) -> Result<tonic::Response<super::DeployDockerComposeResponse>, tonic::Status>;
    }

    #[derive(Debug, Clone)]
    pub struct DeployDockerComposeServer<T: DeployDockerCompose> {
        inner: Arc<T>,
    }

    impl<T: DeployDockerCompose> DeployDockerComposeServer<T> {
        pub fn new(inner: T) -> Self {
            Self {
                inner: Arc::new(inner),
            }
        }

        pub fn from_arc(inner: Arc<T>) -> Self {
            Self { inner }
        }
    }

    impl<T: DeployDockerCompose> Service<http::Request<tonic::body::BoxBody>>
        for DeployDockerComposeServer<T>
    {
        type Response = http::Response<tonic::body::BoxBody>;
        type Error = std::convert::Infallible;
        type Future = BoxFuture<Self::Response, Self::Error>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: http::Request<tonic::body::BoxBody>) -> Self::Future {
            let inner = self.inner.clone();
            match req.uri().path() {
                "/deployAgent.DeployDockerCompose/Deploy" => {
                    struct DeploySvc<T: DeployDockerCompose>(pub Arc<T>);
                    impl<T: DeployDockerCompose>
                        tonic::server::UnaryService<super::DeployDockerComposeRequest>
                        for DeploySvc<T>
                    {
                        type Response = super::DeployDockerComposeResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::DeployDockerComposeRequest>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            Box::pin(async move { inner.deploy(request).await })
                        }
                    }
                    Box::pin(async move {
                        let method = DeploySvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec);
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    })
                }
                _ => Box::pin(async move {
                    Ok(http::Response::builder()
                        .status(200)
                        .header("grpc-status", "12")
                        .header("content-type", "application/grpc")
                        .body(tonic::body::empty_body())
                        .unwrap())
                }),
            }
        }
    }

    impl<T: DeployDockerCompose> tonic::server::NamedService for DeployDockerComposeServer<T> {
        const NAME: &'static str = "deployAgent.DeployDockerCompose";
    }
}
