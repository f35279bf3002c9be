//! Centralized string constants for the cmdgen CLI

// HTTP Headers
pub const HEADER_ACCEPT: &str = "Accept";
pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_BLOB_TYPE: &str = "x-ms-blob-type";
pub const HEADER_FOLDER_ID: &str = "X-UIPATH-OrganizationUnitId";

// Content Types
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_MULTIPART: &str = "multipart/form-data";
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

// HTTP Methods
pub const HTTP_METHOD_GET: &str = "GET";
pub const HTTP_METHOD_POST: &str = "POST";
pub const HTTP_METHOD_PUT: &str = "PUT";
pub const HTTP_METHOD_DELETE: &str = "DELETE";
pub const HTTP_METHOD_PATCH: &str = "PATCH";
pub const HTTP_METHOD_HEAD: &str = "HEAD";
pub const HTTP_METHOD_OPTIONS: &str = "OPTIONS";
pub const HTTP_METHOD_TRACE: &str = "TRACE";

// Definition parsing
pub const DEFAULT_GROUP: &str = "default";
pub const RAW_BODY_PARAMETER: &str = "file";
pub const JSON_BODY_PARAMETER: &str = "body";
pub const EXT_CLI_HIDDEN: &str = "x-cli-hidden";
pub const DEFAULT_SERVER_URL: &str = "https://cloud.example.com/{organization}/{tenant}";
pub const SERVER_VAR_ORGANIZATION: &str = "organization";
pub const SERVER_VAR_TENANT: &str = "tenant";

// Fields that some definitions encode as 0/1 instead of booleans
pub const FIELD_DEPRECATED: &str = "deprecated";
pub const FIELD_REQUIRED: &str = "required";
pub const FIELD_READ_ONLY: &str = "readOnly";
pub const FIELD_WRITE_ONLY: &str = "writeOnly";
pub const FIELD_NULLABLE: &str = "nullable";
pub const FIELD_UNIQUE_ITEMS: &str = "uniqueItems";
pub const FIELD_ALLOW_EMPTY_VALUE: &str = "allowEmptyValue";
pub const FIELD_EXPLODE: &str = "explode";
pub const FIELD_ALLOW_RESERVED: &str = "allowReserved";

// Reserved global flags
pub const FLAG_DEBUG: &str = "debug";
pub const FLAG_INSECURE: &str = "insecure";
pub const FLAG_PROFILE: &str = "profile";
pub const FLAG_OUTPUT: &str = "output";
pub const FLAG_HELP: &str = "help";

// Profiles and files
pub const DEFAULT_PROFILE: &str = "default";
pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const PLUGINS_FILE_NAME: &str = "plugins.yaml";
pub const DEFINITIONS_DIR: &str = "definitions";
pub const AUTH_CACHE_DIR: &str = ".cache/auth";
pub const DEFINITION_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

// Environment variables
pub const ENV_CONFIG_DIR: &str = "CMDGEN_CONFIG_DIR";
pub const ENV_CONFIGURATION_PATH: &str = "CMDGEN_CONFIGURATION_PATH";
pub const ENV_PLUGINS_PATH: &str = "CMDGEN_PLUGINS_PATH";
pub const ENV_DEFINITIONS_PATH: &str = "CMDGEN_DEFINITIONS_PATH";
pub const ENV_CACHE_PATH: &str = "CMDGEN_CACHE_PATH";
pub const ENV_PROFILE: &str = "CMDGEN_PROFILE";
pub const ENV_URI: &str = "CMDGEN_URI";
pub const ENV_ORGANIZATION: &str = "CMDGEN_ORGANIZATION";
pub const ENV_TENANT: &str = "CMDGEN_TENANT";
pub const ENV_LOG: &str = "CMDGEN_LOG";
pub const ENV_LOG_FORMAT: &str = "CMDGEN_LOG_FORMAT";
pub const ENV_LOG_FILE: &str = "CMDGEN_LOG_FILE";
pub const ENV_LOG_MAX_BODY: &str = "CMDGEN_LOG_MAX_BODY";

// Auth option keys
pub const AUTH_TYPE: &str = "type";
pub const AUTH_PAT: &str = "pat";
pub const AUTH_CLIENT_ID: &str = "clientId";
pub const AUTH_CLIENT_SECRET: &str = "clientSecret";
pub const AUTH_REDIRECT_URI: &str = "redirectUri";
pub const AUTH_SCOPES: &str = "scopes";
pub const AUTH_URI: &str = "uri";
pub const IDENTITY_PATH: &str = "identity_";

// Tracing targets
pub const LOG_TARGET_HTTP: &str = "cmdgen::http";
pub const LOG_TARGET_AUTH: &str = "cmdgen::auth";
pub const LOG_TARGET_PLUGIN: &str = "cmdgen::plugin";

// Exit codes
pub const EXIT_CONFIG_ERROR: i32 = 131;
pub const EXIT_PLUGIN_CONFIG_ERROR: i32 = 132;
