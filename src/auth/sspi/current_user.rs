//! The logged-in user's credentials, through Windows SSPI.

use windows::core::{HSTRING, PCWSTR};
use windows::Win32::Foundation::{
    SEC_E_OK, SEC_I_COMPLETE_AND_CONTINUE, SEC_I_COMPLETE_NEEDED, SEC_I_CONTINUE_NEEDED,
};
use windows::Win32::Security::Authentication::Identity::{
    AcquireCredentialsHandleW, CompleteAuthToken, DeleteSecurityContext, FreeCredentialsHandle,
    InitializeSecurityContextW, SecBuffer, SecBufferDesc, ISC_REQ_CONNECTION, ISC_REQ_MUTUAL_AUTH,
    SECBUFFER_TOKEN, SECBUFFER_VERSION, SECPKG_CRED_OUTBOUND, SECURITY_NATIVE_DREP,
};
use windows::Win32::Security::Credentials::SecHandle;

use super::{Package, SecurityContext, SecurityProvider, SecurityStatus};

// Large enough for any Negotiate token (cbMaxToken is 48256 for Kerberos).
const MAX_TOKEN: usize = 48 * 1024;

/// Authenticates as the user running the process.
#[derive(Clone, Copy, Debug, Default)]
pub struct CurrentUser;

impl SecurityProvider for CurrentUser {
    fn acquire_credentials(
        &self,
        package: Package,
    ) -> Result<Box<dyn SecurityContext>, SecurityStatus> {
        let name = HSTRING::from(package.as_str());
        let mut credentials = SecHandle::default();

        // SAFETY: every pointer outlives the call; no logon id or auth data
        // means the current user's credentials.
        unsafe {
            AcquireCredentialsHandleW(
                PCWSTR::null(),
                &name,
                SECPKG_CRED_OUTBOUND,
                None,
                None,
                None,
                None,
                &mut credentials,
                None,
            )
        }
        .map_err(to_status)?;

        log::debug!("acquired {package} credentials for the current user");
        Ok(Box::new(Context {
            credentials,
            context: None,
        }))
    }
}

struct Context {
    credentials: SecHandle,
    context: Option<SecHandle>,
}

impl SecurityContext for Context {
    fn initialize_context(
        &mut self,
        spn: &str,
        input_token: Option<&[u8]>,
    ) -> Result<(Vec<u8>, bool), SecurityStatus> {
        let target: Vec<u16> = spn.encode_utf16().chain(Some(0)).collect();

        let mut input = input_token.map(<[u8]>::to_vec).unwrap_or_default();
        let mut in_buffer = SecBuffer {
            cbBuffer: input.len() as u32,
            BufferType: SECBUFFER_TOKEN,
            pvBuffer: input.as_mut_ptr().cast(),
        };
        let in_desc = SecBufferDesc {
            ulVersion: SECBUFFER_VERSION,
            cBuffers: 1,
            pBuffers: &mut in_buffer,
        };

        let mut output = vec![0u8; MAX_TOKEN];
        let mut out_buffer = SecBuffer {
            cbBuffer: output.len() as u32,
            BufferType: SECBUFFER_TOKEN,
            pvBuffer: output.as_mut_ptr().cast(),
        };
        let mut out_desc = SecBufferDesc {
            ulVersion: SECBUFFER_VERSION,
            cBuffers: 1,
            pBuffers: &mut out_buffer,
        };

        let mut new_context = self.context.unwrap_or_default();
        let mut attributes = 0u32;

        // SAFETY: the buffers and handles above outlive the call, and the
        // output buffer is MAX_TOKEN bytes as advertised in cbBuffer.
        let status = unsafe {
            InitializeSecurityContextW(
                Some(&self.credentials as *const SecHandle),
                self.context.as_ref().map(|c| c as *const SecHandle),
                Some(target.as_ptr()),
                ISC_REQ_CONNECTION | ISC_REQ_MUTUAL_AUTH,
                0,
                SECURITY_NATIVE_DREP,
                input_token.map(|_| &in_desc as *const SecBufferDesc),
                0,
                Some(&mut new_context as *mut SecHandle),
                Some(&mut out_desc as *mut SecBufferDesc),
                &mut attributes,
                None,
            )
        };

        let complete = if status == SEC_E_OK {
            true
        } else if status == SEC_I_CONTINUE_NEEDED {
            false
        } else if status == SEC_I_COMPLETE_NEEDED || status == SEC_I_COMPLETE_AND_CONTINUE {
            // SAFETY: new_context was just initialized and out_desc holds its token.
            unsafe { CompleteAuthToken(&new_context, &out_desc) }.map_err(to_status)?;
            status == SEC_I_COMPLETE_NEEDED
        } else {
            return Err(SecurityStatus(status.0));
        };
        self.context = Some(new_context);

        output.truncate(out_buffer.cbBuffer as usize);
        Ok((output, complete))
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        // SAFETY: both handles were produced by SSPI and are released once.
        unsafe {
            if let Some(ref context) = self.context {
                let _ = DeleteSecurityContext(context);
            }
            let _ = FreeCredentialsHandle(&self.credentials);
        }
    }
}

fn to_status(err: windows::core::Error) -> SecurityStatus {
    SecurityStatus(err.code().0)
}
